use crate::core::process_models::declare::{
    parse_declare_model, AttributeDomain, DeclareConstraint, DeclareModel, DeclareParseOptions,
    ALL_TEMPLATE_KINDS,
};

mod checking_property_tests;
mod mining_tests;

/// Model using every template, with conditions where the template allows them
fn model_with_all_templates() -> DeclareModel {
    let mut model = DeclareModel::new();
    for act in ["A", "B", "C"] {
        model.add_activity(act);
    }
    model.bind_attribute("A", "grade").unwrap();
    model.bind_attribute("B", "grade").unwrap();
    model.bind_attribute("B", "resource").unwrap();
    model
        .set_attribute_domain("grade", AttributeDomain::IntegerRange { min: 0, max: 10 })
        .unwrap();
    model
        .set_attribute_domain(
            "resource",
            AttributeDomain::Enumeration {
                values: vec!["Mona".into(), "Lars".into()],
            },
        )
        .unwrap();
    for t in ALL_TEMPLATE_KINDS {
        let c = if t.is_binary() {
            DeclareConstraint::binary(*t, "A", "B").with_conditions(
                "A.grade > 3",
                "T.resource is Mona",
                "0,2,h",
            )
        } else {
            let c = DeclareConstraint::unary(*t, "C");
            if t.supports_cardinality() {
                c.with_cardinality(2)
            } else {
                c
            }
        };
        model.add_constraint(c).unwrap();
    }
    // same constraint twice stays twice
    model
        .add_constraint(DeclareConstraint::binary(
            crate::core::process_models::declare::TemplateKind::Response,
            "B",
            "C",
        ))
        .unwrap();
    model
        .add_constraint(DeclareConstraint::binary(
            crate::core::process_models::declare::TemplateKind::Response,
            "B",
            "C",
        ))
        .unwrap();
    model
}

#[test]
fn test_model_round_trip() {
    let model = model_with_all_templates();
    let text = model.to_declare_string();
    let parsed = parse_declare_model(&text, &DeclareParseOptions::strict()).unwrap();
    assert_eq!(parsed, model);
    assert_eq!(parsed.to_declare_string(), text);
    assert_eq!(parsed.constraints().len(), ALL_TEMPLATE_KINDS.len() + 2);
}

#[test]
fn test_model_serializes_to_json() {
    let model = model_with_all_templates();
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(
        json["constraints"].as_array().map(Vec::len),
        Some(ALL_TEMPLATE_KINDS.len() + 2)
    );
    assert_eq!(json["activities"][0]["name"], "A");
}
