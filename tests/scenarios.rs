use approx::assert_abs_diff_eq;
use kindred::inference::{POPULATION_CARRIER_RATE, SIBLING_CARRIER_POSTERIOR};
use kindred::request::RelativeFacts;
use kindred::{
    InheritanceMode, Pedigree, RiskEngine, RiskError, RiskRequest, RuleBasedEstimator, Sex,
    calculate_child_risk, infer_pedigree,
};

fn carrier_probability_of(report: &kindred::RiskReport, name: &str) -> f64 {
    report
        .members
        .iter()
        .find(|m| m.name == name)
        .map(|m| m.carrier_probability)
        .unwrap_or_else(|| panic!("no member named {name}"))
}

#[test]
fn half_carrier_parents_under_recessive_inheritance() {
    let mut pedigree = Pedigree::new();
    let mother = pedigree.add_founder("Mother", Sex::Female, false, 1).unwrap();
    let father = pedigree.add_founder("Father", Sex::Male, false, 1).unwrap();
    let child = pedigree
        .add_child("Child", Sex::Male, false, Some(mother), Some(father))
        .unwrap();
    pedigree.set_carrier_probability(mother, 0.5).unwrap();
    pedigree.set_carrier_probability(father, 0.5).unwrap();

    let result = calculate_child_risk(
        &pedigree,
        child,
        mother,
        father,
        InheritanceMode::AutosomalRecessive,
    )
    .unwrap();

    assert_abs_diff_eq!(result.risk, 0.0625, epsilon = 1e-12);
    assert!(result.explanation[0].contains("Autosomal Recessive"));
    assert!(
        result
            .explanation
            .iter()
            .any(|line| line.contains("0.50 × 0.50 × 0.25"))
    );
}

#[test]
fn affected_mother_under_x_linkage_gives_certain_risk_to_a_son() {
    let mut request = RiskRequest::new("XL", Sex::Male);
    request.mother_affected = true;

    let report = RiskEngine::new().estimate(&request).unwrap();
    assert_eq!(carrier_probability_of(&report, "Mother"), 1.0);
    assert_eq!(report.risk, 1.0);
    assert_eq!(report.explanation[0], "X-Linked Inheritance");
}

#[test]
fn no_family_history_falls_back_to_the_population_prior() {
    let request = RiskRequest::new("AR", Sex::Female);
    let report = RiskEngine::new().estimate(&request).unwrap();

    for member in report.members.iter().filter(|m| m.name != "Child") {
        assert_eq!(member.carrier_probability, POPULATION_CARRIER_RATE);
        assert_eq!(member.reason, "no family history ⇒ population prior");
    }
    assert_abs_diff_eq!(report.risk, 0.02 * 0.02 * 0.25, epsilon = 1e-15);
    assert_abs_diff_eq!(report.risk, 0.0001, epsilon = 1e-15);
}

#[test]
fn unsupported_mode_is_rejected_without_a_risk() {
    let request = RiskRequest::new("XX", Sex::Male);
    match RiskEngine::new().estimate(&request) {
        Err(RiskError::InvalidInheritanceMode(mode)) => assert_eq!(mode, "XX"),
        other => panic!("Expected InvalidInheritanceMode, got {:?}", other),
    }
}

#[test]
fn both_parents_affected_makes_an_unaffected_child_a_likely_carrier() {
    let mut pedigree = Pedigree::new();
    let mother = pedigree.add_founder("Mother", Sex::Female, true, 1).unwrap();
    let father = pedigree.add_founder("Father", Sex::Male, true, 1).unwrap();
    let child = pedigree
        .add_child("Child", Sex::Female, false, Some(mother), Some(father))
        .unwrap();

    infer_pedigree(&mut pedigree, &RuleBasedEstimator).unwrap();
    assert_eq!(
        pedigree.member(child).carrier_probability(),
        Some(SIBLING_CARRIER_POSTERIOR)
    );
}

#[test]
fn affected_aunt_raises_the_mother_and_the_child_risk() {
    let mut request = RiskRequest::new("AR", Sex::Male);
    request.mother_siblings.push(RelativeFacts {
        sex: Sex::Female,
        affected: true,
    });

    let report = RiskEngine::new().estimate(&request).unwrap();
    let mother = report
        .members
        .iter()
        .find(|m| m.name == "Mother")
        .unwrap();
    assert_eq!(mother.carrier_probability, 0.67);
    assert_eq!(mother.reason, "affected sibling ⇒ posterior ≈ 0.67");

    // The affected aunt also makes both maternal grandparents obligate carriers.
    assert_eq!(carrier_probability_of(&report, "Maternal grandmother"), 1.0);
    assert_eq!(carrier_probability_of(&report, "Maternal grandfather"), 1.0);
    assert_abs_diff_eq!(report.risk, 0.67 * 0.02 * 0.25, epsilon = 1e-12);
    assert_eq!(report.explanation[2], "Risk = 0.67 × 0.02 × 0.25");
}

#[test]
fn affected_sibling_of_the_child_makes_both_parents_carriers() {
    let mut request = RiskRequest::new("AR", Sex::Female);
    request.siblings.push(RelativeFacts {
        sex: Sex::Male,
        affected: true,
    });

    let report = RiskEngine::new().estimate(&request).unwrap();
    assert_eq!(carrier_probability_of(&report, "Mother"), 1.0);
    assert_eq!(carrier_probability_of(&report, "Father"), 1.0);
    // "affected-sibling" outranks "carrier-parents" for the child.
    assert_eq!(carrier_probability_of(&report, "Child"), 0.67);
    assert_abs_diff_eq!(report.risk, 0.25, epsilon = 1e-12);
}

#[test]
fn dominant_risk_with_an_affected_father() {
    let mut request = RiskRequest::new("AD", Sex::Male);
    request.father_affected = true;

    let report = RiskEngine::new().estimate(&request).unwrap();
    assert_eq!(report.mode_name, "Autosomal Dominant");
    assert_abs_diff_eq!(report.risk, 1.0, epsilon = 1e-12);
}
