use approx::assert_abs_diff_eq;
use kindred::child_risk::{dominant_risk, recessive_risk, x_linked_risk};
use kindred::request::RelativeFacts;
use kindred::{
    EstimatorKind, InheritanceMode, MemberId, Pedigree, RiskEngine, RiskRequest, Sex,
    calculate_child_risk,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SAMPLES: usize = 500;

fn trio(mother_affected: bool, child_sex: Sex, m: f64, f: f64) -> (Pedigree, [MemberId; 3]) {
    let mut pedigree = Pedigree::new();
    let mother = pedigree
        .add_founder("Mother", Sex::Female, mother_affected, 1)
        .unwrap();
    let father = pedigree.add_founder("Father", Sex::Male, false, 1).unwrap();
    let child = pedigree
        .add_child("Child", child_sex, false, Some(mother), Some(father))
        .unwrap();
    pedigree.set_carrier_probability(mother, m).unwrap();
    pedigree.set_carrier_probability(father, f).unwrap();
    (pedigree, [child, mother, father])
}

fn risk(mode: InheritanceMode, mother_affected: bool, child_sex: Sex, m: f64, f: f64) -> f64 {
    let (pedigree, [child, mother, father]) = trio(mother_affected, child_sex, m, f);
    calculate_child_risk(&pedigree, child, mother, father, mode)
        .unwrap()
        .risk
}

fn random_sex(rng: &mut StdRng) -> Sex {
    if rng.gen_bool(0.5) { Sex::Male } else { Sex::Female }
}

fn random_relatives(rng: &mut StdRng) -> Vec<RelativeFacts> {
    (0..rng.gen_range(0..3))
        .map(|_| RelativeFacts {
            sex: random_sex(rng),
            affected: rng.gen_bool(0.2),
        })
        .collect()
}

#[test]
fn recessive_risk_is_symmetric_and_monotone() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..SAMPLES {
        let m: f64 = rng.gen_range(0.0..=1.0);
        let f: f64 = rng.gen_range(0.0..=1.0);
        let bump: f64 = rng.gen_range(0.0..=1.0 - m);

        let forward = risk(InheritanceMode::AutosomalRecessive, false, Sex::Male, m, f);
        let swapped = risk(InheritanceMode::AutosomalRecessive, false, Sex::Male, f, m);
        assert_abs_diff_eq!(forward, swapped, epsilon = 1e-15);
        assert_abs_diff_eq!(forward, recessive_risk(m, f), epsilon = 1e-15);

        let raised = risk(
            InheritanceMode::AutosomalRecessive,
            false,
            Sex::Male,
            (m + bump).min(1.0),
            f,
        );
        assert!(raised >= forward);
        assert!(forward <= 0.25);
    }
}

#[test]
fn x_linked_risk_follows_the_child_sex() {
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..SAMPLES {
        let m: f64 = rng.gen_range(0.0..=1.0);
        let f: f64 = rng.gen_range(0.0..=1.0);

        assert_abs_diff_eq!(
            risk(InheritanceMode::XLinked, false, Sex::Male, m, f),
            m,
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(
            risk(InheritanceMode::XLinked, false, Sex::Female, m, f),
            m * 0.5,
            epsilon = 1e-15
        );
        assert_eq!(x_linked_risk(m, true, random_sex(&mut rng)), 1.0);
    }
}

#[test]
fn dominant_risk_is_bounded_by_the_parents() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..SAMPLES {
        let m: f64 = rng.gen_range(0.0..=1.0);
        let f: f64 = rng.gen_range(0.0..=1.0);

        let value = risk(InheritanceMode::AutosomalDominant, false, Sex::Female, m, f);
        assert_abs_diff_eq!(value, dominant_risk(m, f), epsilon = 1e-15);
        assert!(value >= m.max(f) - 1e-12);
        assert!(value <= 1.0);
    }
}

#[test]
fn random_families_respect_the_carrier_invariants() {
    let mut rng = StdRng::seed_from_u64(4);
    let engine = RiskEngine::new();
    let modes = ["AR", "AD", "XL", " xl ", "ad"];

    for _ in 0..SAMPLES {
        let mode = modes[rng.gen_range(0..modes.len())];
        let mut request = RiskRequest::new(mode, random_sex(&mut rng));
        request.child_affected = rng.gen_bool(0.1);
        request.mother_affected = rng.gen_bool(0.2);
        request.father_affected = rng.gen_bool(0.2);
        request.maternal_grandmother_affected = rng.gen_bool(0.1);
        request.maternal_grandfather_affected = rng.gen_bool(0.1);
        request.paternal_grandmother_affected = rng.gen_bool(0.1);
        request.paternal_grandfather_affected = rng.gen_bool(0.1);
        request.mother_siblings = random_relatives(&mut rng);
        request.father_siblings = random_relatives(&mut rng);
        request.siblings = random_relatives(&mut rng);

        let report = engine.estimate(&request).unwrap();
        assert_eq!(report.estimator, EstimatorKind::Rules);
        assert!((0.0..=1.0).contains(&report.risk));
        assert_eq!(report.explanation.len(), 3);
        for member in &report.members {
            assert!((0.0..=1.0).contains(&member.carrier_probability));
            if member.affected {
                assert_eq!(member.carrier_probability, 1.0, "{}", member.name);
            }
            assert!(
                [1.0, 0.67, 0.02].contains(&member.carrier_probability),
                "{} has {}",
                member.name,
                member.carrier_probability
            );
        }
    }
}

#[test]
fn batch_results_match_single_estimates() {
    let mut rng = StdRng::seed_from_u64(5);
    let engine = RiskEngine::new();
    let requests: Vec<RiskRequest> = (0..64)
        .map(|_| {
            let mut request = RiskRequest::new("AR", random_sex(&mut rng));
            request.mother_affected = rng.gen_bool(0.3);
            request.siblings = random_relatives(&mut rng);
            request
        })
        .collect();

    let batch = engine.estimate_batch(&requests);
    for (request, result) in requests.iter().zip(batch) {
        assert_eq!(result.unwrap(), engine.estimate(request).unwrap());
    }
}
