use kindred::calibrate::data::load_training_data;
use kindred::calibrate::estimate::train_model;
use kindred::calibrate::generate::{generate_rows, write_dataset};
use kindred::calibrate::model::{ModelConfig, TrainedModel};
use kindred::request::{RelativeFacts, RequestBatch, ReportBatch};
use kindred::{CarrierClassifier, EstimatorKind, RiskEngine, RiskError, RiskRequest, Sex};
use std::sync::Arc;
use tempfile::tempdir;

fn model_request(mode: &str) -> RiskRequest {
    let mut request = RiskRequest::new(mode, Sex::Male);
    request.estimator = EstimatorKind::Model;
    request
}

#[test]
fn generate_train_save_load_and_estimate() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("synthetic_genetic_data.csv");
    let model_path = dir.path().join("carrier_model.toml");

    assert_eq!(write_dataset(&data_path, generate_rows(3000, 17)).unwrap(), 3000);
    let data = load_training_data(&data_path).unwrap();
    let model = train_model(&data, &ModelConfig::default()).unwrap();
    assert!(model.summary.roc_auc.is_some_and(|auc| auc > 0.5));
    model.save(&model_path).unwrap();

    let reloaded = TrainedModel::load(&model_path).unwrap();
    assert_eq!(reloaded, model);

    let classifier = Arc::new(CarrierClassifier::load(&model_path).unwrap());
    let engine = RiskEngine::with_classifier(Arc::clone(&classifier));

    // An affected sibling should raise the model's estimate for the mother.
    let baseline = engine.estimate(&model_request("AR")).unwrap();
    let mut informative = model_request("AR");
    informative.mother_siblings.push(RelativeFacts {
        sex: Sex::Male,
        affected: true,
    });
    let raised = engine.estimate(&informative).unwrap();

    let mother = |report: &kindred::RiskReport| {
        report
            .members
            .iter()
            .find(|m| m.name == "Mother")
            .map(|m| m.carrier_probability)
            .unwrap()
    };
    assert!(mother(&raised) > mother(&baseline));
    assert!(raised.risk > baseline.risk);
    assert_eq!(raised.estimator, EstimatorKind::Model);

    for report in [&baseline, &raised] {
        for member in &report.members {
            assert!((0.0..=1.0).contains(&member.carrier_probability));
            if member.affected {
                assert_eq!(member.carrier_probability, 1.0);
            }
        }
    }
}

#[test]
fn missing_model_file_is_reported_as_unavailable() {
    let dir = tempdir().unwrap();
    let err = CarrierClassifier::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, RiskError::ModelUnavailable(_)));
}

#[test]
fn batch_files_mix_estimators_and_failures() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.csv");
    write_dataset(&data_path, generate_rows(1000, 23)).unwrap();
    let model = train_model(
        &load_training_data(&data_path).unwrap(),
        &ModelConfig::default(),
    )
    .unwrap();
    let classifier = CarrierClassifier::from_model(model).unwrap();
    let engine = RiskEngine::with_classifier(Arc::new(classifier));

    let requests_path = dir.path().join("requests.toml");
    RequestBatch {
        requests: vec![
            RiskRequest::new("AR", Sex::Female),
            model_request("XL"),
            RiskRequest::new("AX", Sex::Male),
        ],
    }
    .save(&requests_path)
    .unwrap();

    let batch = RequestBatch::load(&requests_path).unwrap();
    let results = engine.estimate_batch(&batch.requests);
    let reports = ReportBatch::from_results(results);

    assert_eq!(reports.reports.len(), 3);
    assert_eq!(
        reports.reports[0].report.as_ref().unwrap().estimator,
        EstimatorKind::Rules
    );
    assert_eq!(
        reports.reports[1].report.as_ref().unwrap().estimator,
        EstimatorKind::Model
    );
    assert!(reports.reports[2].report.is_none());
    assert!(reports.reports[2].error.is_some());

    let output = dir.path().join("reports.toml");
    reports.save(&output).unwrap();
    assert_eq!(ReportBatch::load(&output).unwrap(), reports);
}
