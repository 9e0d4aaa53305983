use nexa_bindings::{
    Binding, Config, Constant, DecimalExpression, DecimalProperty, DivisionPolicy, Error,
    NumericValue, ObservableValue, Rounding, bindings, context,
};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

#[test]
fn test_fluent_and_functional_forms_agree() {
    let a = DecimalProperty::new(dec!(7.5));
    let b = DecimalProperty::new(dec!(2.5));

    let pairs = [
        (a.add(&b).unwrap(), bindings::add(&a, &b).unwrap()),
        (a.subtract(&b).unwrap(), bindings::subtract(&a, &b).unwrap()),
        (a.multiply(&b).unwrap(), bindings::multiply(&a, &b).unwrap()),
        (a.divide(&b).unwrap(), bindings::divide(&a, &b).unwrap()),
        (a.negate().unwrap(), bindings::negate(&a).unwrap()),
    ];
    for (fluent, functional) in &pairs {
        assert_eq!(fluent.get().unwrap(), functional.get().unwrap());
        assert_eq!(fluent.dependencies(), functional.dependencies());
    }

    b.set(dec!(-0.5)).unwrap();
    for (fluent, functional) in &pairs {
        assert_eq!(fluent.get().unwrap(), functional.get().unwrap());
    }
    assert_eq!(pairs[3].0.get().unwrap(), dec!(-15));
    assert_eq!(pairs[4].0.get().unwrap(), dec!(-7.5));
}

#[test]
fn test_literal_operands_do_not_subscribe() {
    let a = DecimalProperty::new(dec!(2));
    let sum = a.add(5).unwrap();
    assert_eq!(sum.dependencies(), vec![a.id()]);

    let literal = bindings::add(1, 2i64).unwrap();
    assert!(literal.dependencies().is_empty());
    assert_eq!(literal.get().unwrap(), dec!(3));

    let constant = Constant::from_f64(0.25).unwrap();
    let scaled = bindings::multiply(&a, constant).unwrap();
    assert_eq!(scaled.get().unwrap(), dec!(0.5));
    assert_eq!(scaled.dependencies(), vec![a.id()]);
}

#[test]
fn test_same_operand_is_one_dependency() {
    let a = DecimalProperty::new(dec!(3));
    let square = a.multiply(&a).unwrap();
    assert_eq!(square.dependencies(), vec![a.id()]);
    assert_eq!(context::describe(a.id()).unwrap().observers, vec![square.id()]);
    assert_eq!(square.get().unwrap(), dec!(9));
}

#[test]
fn test_float_literals_are_exact() {
    let a = DecimalProperty::new(dec!(0.1));
    let sum = a.add(0.2).unwrap();
    assert_eq!(sum.get().unwrap(), dec!(0.3));
    assert!(a.is_equal_to(0.1).unwrap().get().unwrap());
    assert!(a.add(0.1f32).unwrap().is_equal_to(0.2).unwrap().get().unwrap());
}

#[rstest]
#[case("1.0", "1.00", [true, false, false, false, true, true])]
#[case("2", "10", [false, true, false, true, false, true])]
#[case("-0.5", "-0.6", [false, true, true, false, true, false])]
#[case("0.30000000000000001", "0.3", [false, true, true, false, true, false])]
fn test_relational_operators(#[case] left: &str, #[case] right: &str, #[case] expected: [bool; 6]) {
    let a = DecimalProperty::new(Decimal::from_str(left).unwrap());
    let b = DecimalProperty::new(Decimal::from_str(right).unwrap());

    let fluent = [
        a.is_equal_to(&b).unwrap(),
        a.is_not_equal_to(&b).unwrap(),
        a.greater_than(&b).unwrap(),
        a.less_than(&b).unwrap(),
        a.greater_than_or_equal_to(&b).unwrap(),
        a.less_than_or_equal_to(&b).unwrap(),
    ];
    let functional = [
        bindings::equal(&a, &b).unwrap(),
        bindings::not_equal(&a, &b).unwrap(),
        bindings::greater_than(&a, &b).unwrap(),
        bindings::less_than(&a, &b).unwrap(),
        bindings::greater_than_or_equal(&a, &b).unwrap(),
        bindings::less_than_or_equal(&a, &b).unwrap(),
    ];
    for i in 0..6 {
        assert_eq!(fluent[i].get().unwrap(), expected[i], "operator {i}");
        assert_eq!(functional[i].get().unwrap(), expected[i], "operator {i}");
    }
}

#[test]
fn test_relational_bindings_follow_changes() {
    let limit = DecimalProperty::new(dec!(100));
    let spent = DecimalProperty::new(dec!(40));
    let over = spent.greater_than(&limit).unwrap();
    assert!(!over.get().unwrap());

    spent.set(dec!(100.01)).unwrap();
    assert!(over.get().unwrap());
    assert_eq!(over.to_string(), "BooleanBinding [value: true]");
}

#[test]
fn test_division_errors_surface_at_get() {
    let a = DecimalProperty::new(dec!(1));
    let b = DecimalProperty::new(dec!(0));
    let quotient = a.divide(&b).unwrap();

    assert_eq!(quotient.get(), Err(Error::DivisionByZero));
    assert!(!quotient.is_valid(), "A failed computation stays invalid");

    b.set(dec!(3)).unwrap();
    assert!(matches!(
        quotient.get(),
        Err(Error::NonTerminatingDecimal { .. })
    ));

    b.set(dec!(8)).unwrap();
    assert_eq!(quotient.get().unwrap(), dec!(0.125));
    assert!(quotient.is_valid());
}

#[test]
fn test_rounded_division_policy() {
    context::configure(Config {
        division: DivisionPolicy::Rounded {
            scale: 4,
            rounding: Rounding::HalfEven,
        },
    });
    let third = bindings::divide(2, 3).unwrap();
    assert_eq!(third.get().unwrap(), dec!(0.6667));

    let exact = bindings::divide(dec!(0.00005), 2).unwrap();
    assert_eq!(exact.get().unwrap(), dec!(0.0000));

    context::configure(Config::default());
    assert_eq!(context::config().division, DivisionPolicy::Exact);
    // Already computed values are not touched by a new policy.
    assert_eq!(third.get().unwrap(), dec!(0.6667));
    assert!(bindings::divide(2, 3).unwrap().get().is_err());
}

#[test]
fn test_overflow_surfaces_at_get() {
    let big = DecimalProperty::new(Decimal::MAX);
    let doubled = big.multiply(2).unwrap();
    assert_eq!(doubled.get(), Err(Error::Overflow { op: "multiply" }));
}

#[test]
fn test_disposed_operand_is_rejected_immediately() {
    let a = DecimalProperty::new(dec!(1));
    let doubled = a.multiply(2).unwrap();
    doubled.dispose();

    assert_eq!(doubled.add(1).unwrap_err(), Error::Disposed);
    assert_eq!(bindings::subtract(&a, &doubled).unwrap_err(), Error::Disposed);
    assert!(doubled.is_equal_to(&a).is_err());
}

#[test]
fn test_unrepresentable_literal_is_rejected() {
    let a = DecimalProperty::new(dec!(1));
    assert!(matches!(
        a.add(f64::NAN),
        Err(Error::NotRepresentable { .. })
    ));
    assert!(matches!(
        a.multiply(1e-300),
        Err(Error::NotRepresentable { .. })
    ));
    assert!(Constant::from_f64(1e-300).is_err());
}

#[test]
fn test_exact_arithmetic_never_rounds() {
    let one = DecimalProperty::new(dec!(1));
    let tiny = bindings::divide(&one, Decimal::from(1u128 << 90)).unwrap();
    assert_eq!(tiny.get(), Err(Error::Inexact { op: "divide" }));
    assert!(!tiny.is_valid());

    let a = DecimalProperty::new(dec!(0.00000000000001));
    let product = a.multiply(dec!(0.000000000000001)).unwrap();
    assert_eq!(product.get(), Err(Error::Inexact { op: "multiply" }));
    a.set(dec!(0.0000000000001)).unwrap();
    assert_eq!(product.get().unwrap(), dec!(0.0000000000000000000000000001));
}

#[test]
fn test_numeric_coercions() {
    let a = DecimalProperty::new(dec!(-7.75));
    let scaled = a.multiply(2).unwrap();
    assert_eq!(scaled.int_value().unwrap(), -15);
    assert_eq!(scaled.long_value().unwrap(), -15);
    assert_eq!(scaled.double_value().unwrap(), -15.5);
    assert_eq!(scaled.float_value().unwrap(), -15.5f32);
}

#[test]
fn test_create_decimal_binding_swallows_errors() {
    let a = DecimalProperty::new(dec!(4));
    let root = bindings::create_decimal_binding(
        {
            let a = a.clone();
            move || -> Result<Decimal, String> {
                let value = a.get().map_err(|err| err.to_string())?;
                if value.is_sign_negative() {
                    Err(format!("negative input {value}"))
                } else {
                    Ok(value / dec!(2))
                }
            }
        },
        &[&a],
    )
    .unwrap();
    assert_eq!(root.get().unwrap(), dec!(2));

    a.set(dec!(-1)).unwrap();
    assert_eq!(root.get().unwrap(), Decimal::ZERO);
}

#[test]
fn test_custom_binding_propagates_errors() {
    let a = DecimalProperty::new(dec!(4));
    let checked = Binding::new(&[&a], {
        let a = a.clone();
        move || {
            let value = a.get()?;
            if value.is_zero() {
                Err(Error::DivisionByZero)
            } else {
                Ok(dec!(1) / value)
            }
        }
    })
    .unwrap();
    assert_eq!(checked.get().unwrap(), dec!(0.25));
    a.set(dec!(0)).unwrap();
    assert_eq!(checked.get(), Err(Error::DivisionByZero));
}

#[test]
fn test_format_binding() {
    let a = DecimalProperty::new(dec!(2.5));
    let text = bindings::format(&a, |value: &Decimal| format!("{value} kg")).unwrap();
    assert_eq!(text.get().unwrap(), "2.5 kg");
    a.set(dec!(3)).unwrap();
    assert_eq!(text.get().unwrap(), "3 kg");
}
