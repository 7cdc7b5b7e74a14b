//! Expert rule evaluation against one equipment.
//!
//! Combinators short-circuit in child order. A leaf first checks that its
//! operator is legal for its data type, then reads the field through the
//! kind's capability record. When the field has no value, `EXISTS` is false,
//! the negated operators (`NOT_EQUALS`, `NOT_IN`) are true and every other
//! operator is false.

use gridsift_core::Identifiable;

use crate::error::{FilterError, FilterResult};
use crate::field::FieldValue;
use crate::resolver::EvaluationContext;
use crate::rule::{
    BooleanRule, CombinatorRule, CombinatorType, DataType, EnumRule, ExpertRule, FieldType,
    FilterUuidRule, NumberRule, OperatorType, StringRule,
};

pub fn evaluate(
    rule: &ExpertRule,
    eq: &Identifiable<'_>,
    ctx: &EvaluationContext<'_>,
) -> FilterResult<bool> {
    match rule {
        ExpertRule::Combinator(combinator) => evaluate_combinator(combinator, eq, ctx),
        ExpertRule::String(leaf) => {
            check_operator(leaf.operator, DataType::String)?;
            let value = field_value(ctx, leaf.field, eq)?;
            string_matches(leaf, value.as_ref())
        }
        ExpertRule::Number(leaf) => {
            check_operator(leaf.operator, DataType::Number)?;
            let value = field_value(ctx, leaf.field, eq)?;
            number_matches(leaf, value.as_ref())
        }
        ExpertRule::Boolean(leaf) => {
            check_operator(leaf.operator, DataType::Boolean)?;
            let value = field_value(ctx, leaf.field, eq)?;
            boolean_matches(leaf, value.as_ref())
        }
        ExpertRule::Enum(leaf) => {
            check_operator(leaf.operator, DataType::Enum)?;
            let value = field_value(ctx, leaf.field, eq)?;
            enum_matches(leaf, value.as_ref())
        }
        ExpertRule::FilterUuid(leaf) => {
            check_operator(leaf.operator, DataType::FilterUuid)?;
            let value = field_value(ctx, leaf.field, eq)?;
            filter_uuid_matches(leaf, value.as_ref(), ctx)
        }
    }
}

fn evaluate_combinator(
    combinator: &CombinatorRule,
    eq: &Identifiable<'_>,
    ctx: &EvaluationContext<'_>,
) -> FilterResult<bool> {
    match combinator.combinator {
        CombinatorType::And => {
            for rule in &combinator.rules {
                if !evaluate(rule, eq, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        CombinatorType::Or => {
            for rule in &combinator.rules {
                if evaluate(rule, eq, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn check_operator(operator: OperatorType, data_type: DataType) -> FilterResult<()> {
    if data_type.supports(operator) {
        Ok(())
    } else {
        Err(unsupported(operator, data_type))
    }
}

fn unsupported(operator: OperatorType, data_type: DataType) -> FilterError {
    FilterError::UnsupportedOperator {
        operator,
        data_type,
    }
}

fn field_value(
    ctx: &EvaluationContext<'_>,
    field: FieldType,
    eq: &Identifiable<'_>,
) -> FilterResult<Option<FieldValue>> {
    ctx.registry.capabilities(eq.kind())?.field_value(field, eq)
}

fn literal<'r, T: ?Sized>(
    value: Option<&'r T>,
    field: FieldType,
    operator: OperatorType,
) -> FilterResult<&'r T> {
    value.ok_or_else(|| {
        FilterError::InvalidRule(format!("{} {} rule has no value", field, operator))
    })
}

fn string_matches(leaf: &StringRule, value: Option<&FieldValue>) -> FilterResult<bool> {
    let Some(value) = value else {
        return Ok(leaf.operator.is_negation());
    };
    if leaf.operator == OperatorType::Exists {
        return Ok(true);
    }

    let actual = value.to_string().to_lowercase();
    let expected = literal(leaf.value.as_deref(), leaf.field, leaf.operator)?.to_lowercase();
    match leaf.operator {
        OperatorType::Is => Ok(actual == expected),
        OperatorType::Contains => Ok(actual.contains(&expected)),
        OperatorType::BeginsWith => Ok(actual.starts_with(&expected)),
        OperatorType::EndsWith => Ok(actual.ends_with(&expected)),
        other => Err(unsupported(other, DataType::String)),
    }
}

fn number_matches(leaf: &NumberRule, value: Option<&FieldValue>) -> FilterResult<bool> {
    let Some(value) = value else {
        return Ok(leaf.operator.is_negation());
    };
    if leaf.operator == OperatorType::Exists {
        return Ok(true);
    }

    let actual = value.as_number().ok_or_else(|| {
        FilterError::InvalidRule(format!("{} value '{}' is not numeric", leaf.field, value))
    })?;
    let single = || literal(leaf.value.as_ref(), leaf.field, leaf.operator).copied();
    let values = || literal(leaf.values.as_deref(), leaf.field, leaf.operator);
    match leaf.operator {
        OperatorType::Equals => Ok(actual == single()?),
        OperatorType::NotEquals => Ok(actual != single()?),
        OperatorType::GreaterOrEquals => Ok(actual >= single()?),
        OperatorType::Greater => Ok(actual > single()?),
        OperatorType::LowerOrEquals => Ok(actual <= single()?),
        OperatorType::Lower => Ok(actual < single()?),
        OperatorType::Between => match values()? {
            [min, max] => Ok(*min <= actual && actual <= *max),
            _ => Err(FilterError::InvalidRule(format!(
                "{} BETWEEN rule needs exactly two values",
                leaf.field
            ))),
        },
        OperatorType::In => Ok(values()?.contains(&actual)),
        OperatorType::NotIn => Ok(!values()?.contains(&actual)),
        other => Err(unsupported(other, DataType::Number)),
    }
}

fn boolean_matches(leaf: &BooleanRule, value: Option<&FieldValue>) -> FilterResult<bool> {
    let Some(value) = value else {
        return Ok(leaf.operator.is_negation());
    };
    if leaf.operator == OperatorType::Exists {
        return Ok(true);
    }

    let actual = value.as_bool().ok_or_else(|| {
        FilterError::InvalidRule(format!("{} value '{}' is not a boolean", leaf.field, value))
    })?;
    let expected = *literal(leaf.value.as_ref(), leaf.field, leaf.operator)?;
    match leaf.operator {
        OperatorType::Equals => Ok(actual == expected),
        OperatorType::NotEquals => Ok(actual != expected),
        other => Err(unsupported(other, DataType::Boolean)),
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

fn enum_matches(leaf: &EnumRule, value: Option<&FieldValue>) -> FilterResult<bool> {
    let Some(value) = value else {
        return Ok(leaf.operator.is_negation());
    };
    if leaf.operator == OperatorType::Exists {
        return Ok(true);
    }

    let actual = normalize(&value.to_string());
    let single = || literal(leaf.value.as_deref(), leaf.field, leaf.operator).map(normalize);
    let listed = || {
        literal(leaf.values.as_ref(), leaf.field, leaf.operator)
            .map(|values| values.iter().any(|v| normalize(v) == actual))
    };
    match leaf.operator {
        OperatorType::Equals => Ok(actual == single()?),
        OperatorType::NotEquals => Ok(actual != single()?),
        OperatorType::In => listed(),
        OperatorType::NotIn => listed().map(|found| !found),
        other => Err(unsupported(other, DataType::Enum)),
    }
}

fn filter_uuid_matches(
    leaf: &FilterUuidRule,
    value: Option<&FieldValue>,
    ctx: &EvaluationContext<'_>,
) -> FilterResult<bool> {
    let Some(value) = value else {
        return Ok(leaf.operator.is_negation());
    };
    if leaf.operator == OperatorType::Exists {
        return Ok(true);
    }

    let id = value.to_string();
    let mut member = false;
    for filter_id in &leaf.values {
        if ctx.membership(*filter_id)?.contains(id.as_str()) {
            member = true;
            break;
        }
    }
    match leaf.operator {
        OperatorType::In => Ok(member),
        OperatorType::NotIn => Ok(!member),
        other => Err(unsupported(other, DataType::FilterUuid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::registry::KindRegistry;
    use crate::resolver::{InMemoryFilterStore, MembershipCache};
    use gridsift_core::{
        EnergySource, EquipmentKind, Generator, Kilovolts, Network, Node, Substation,
        VoltageLevel,
    };

    fn network() -> Network {
        let mut network = Network::new();
        network
            .add_node(Node::Substation(Substation {
                id: "S1".into(),
                name: Some("Substation-12".into()),
                country: Some("FR".into()),
                ..Substation::default()
            }))
            .unwrap();
        network
            .add_node(Node::VoltageLevel(VoltageLevel {
                id: "VL1".into(),
                substation: Some("S1".into()),
                nominal_v: Kilovolts(400.0),
                ..VoltageLevel::default()
            }))
            .unwrap();
        network
            .add_node(Node::VoltageLevel(VoltageLevel {
                id: "VL2".into(),
                nominal_v: Kilovolts(63.0),
                ..VoltageLevel::default()
            }))
            .unwrap();
        network
            .add_node(Node::Generator(
                Generator::new("GEN_1", "VL1")
                    .with_p_limits(0.0, 500.0)
                    .with_energy_source(EnergySource::Nuclear),
            ))
            .unwrap();
        network
            .add_node(Node::Generator(Generator::new("GEN_2", "VL2")))
            .unwrap();
        network
    }

    fn check(rule: &ExpertRule, network: &Network, id: &str) -> FilterResult<bool> {
        let store = InMemoryFilterStore::new();
        let cache = MembershipCache::new();
        let config = EngineConfig::default();
        let eq = network.identifiable(id).unwrap();
        let ctx = EvaluationContext::new(
            network,
            KindRegistry::global(),
            &config,
            &store,
            &cache,
            eq.kind(),
        );
        evaluate(rule, &eq, &ctx)
    }

    #[test]
    fn test_string_operators_ignore_case() {
        let network = network();
        let rule = ExpertRule::string(FieldType::Id, OperatorType::Is, "gen_1");
        assert!(check(&rule, &network, "GEN_1").unwrap());
        let rule = ExpertRule::string(FieldType::Id, OperatorType::Contains, "EN_");
        assert!(check(&rule, &network, "GEN_2").unwrap());
        let rule = ExpertRule::string(FieldType::Id, OperatorType::EndsWith, "_2");
        assert!(!check(&rule, &network, "GEN_1").unwrap());
    }

    #[test]
    fn test_absent_field_semantics() {
        let network = network();
        // GEN_2 sits in a voltage level without substation
        let exists = ExpertRule::Enum(EnumRule {
            field: FieldType::Country,
            operator: OperatorType::Exists,
            value: None,
            values: None,
        });
        assert!(!check(&exists, &network, "GEN_2").unwrap());
        assert!(check(&exists, &network, "GEN_1").unwrap());

        let equals = ExpertRule::enumeration(FieldType::Country, OperatorType::Equals, "FR");
        assert!(!check(&equals, &network, "GEN_2").unwrap());
        let not_equals =
            ExpertRule::enumeration(FieldType::Country, OperatorType::NotEquals, "FR");
        assert!(check(&not_equals, &network, "GEN_2").unwrap());
        let not_in = ExpertRule::enumerations(FieldType::Country, OperatorType::NotIn, ["FR"]);
        assert!(check(&not_in, &network, "GEN_2").unwrap());
    }

    #[test]
    fn test_number_operators() {
        let network = network();
        let between =
            ExpertRule::numbers(FieldType::NominalVoltage, OperatorType::Between, vec![63.0, 400.0]);
        assert!(check(&between, &network, "GEN_1").unwrap());
        assert!(check(&between, &network, "GEN_2").unwrap());

        let greater = ExpertRule::number(FieldType::MaxP, OperatorType::Greater, 100.0);
        assert!(check(&greater, &network, "GEN_1").unwrap());
        assert!(!check(&greater, &network, "GEN_2").unwrap());

        let listed = ExpertRule::numbers(FieldType::NominalVoltage, OperatorType::In, vec![63.0]);
        assert!(check(&listed, &network, "GEN_2").unwrap());
    }

    #[test]
    fn test_enum_compare_normalized() {
        let network = network();
        let rule = ExpertRule::enumerations(
            FieldType::EnergySource,
            OperatorType::In,
            ["nuclear", "HYDRO"],
        );
        assert!(check(&rule, &network, "GEN_1").unwrap());
        assert!(!check(&rule, &network, "GEN_2").unwrap());
    }

    #[test]
    fn test_unsupported_operator_fails() {
        let network = network();
        let rule = ExpertRule::string(FieldType::Id, OperatorType::Greater, "A");
        assert_eq!(
            check(&rule, &network, "GEN_1"),
            Err(FilterError::UnsupportedOperator {
                operator: OperatorType::Greater,
                data_type: DataType::String,
            })
        );
    }

    #[test]
    fn test_unsupported_field_fails() {
        let network = network();
        let rule = ExpertRule::number(FieldType::P0, OperatorType::Equals, 1.0);
        assert_eq!(
            check(&rule, &network, "GEN_1"),
            Err(FilterError::UnsupportedField {
                field: FieldType::P0,
                kind: EquipmentKind::Generator,
            })
        );
    }

    #[test]
    fn test_combinators_short_circuit() {
        let network = network();
        // the second child would fail if evaluated
        let bad = ExpertRule::number(FieldType::P0, OperatorType::Equals, 1.0);
        let never = ExpertRule::string(FieldType::Id, OperatorType::Is, "nothing");
        let always = ExpertRule::string(FieldType::Id, OperatorType::BeginsWith, "GEN");

        let and = ExpertRule::and(vec![never, bad.clone()]);
        assert!(!check(&and, &network, "GEN_1").unwrap());
        let or = ExpertRule::or(vec![always, bad]);
        assert!(check(&or, &network, "GEN_1").unwrap());
    }
}
