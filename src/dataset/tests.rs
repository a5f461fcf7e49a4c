use super::*;
use std::fs;
use tempfile::TempDir;

const MEDQUAD_SAMPLE: &str = "\
question,answer,source,focus_area
What is (are) Glaucoma ?,\"Glaucoma is a group of diseases that can damage the eye's optic nerve.\",NIHSeniorHealth,Glaucoma
What causes Glaucoma ?,\"Nearly 2.7 million people have glaucoma, a leading cause of blindness.\",NIHSeniorHealth,Glaucoma
What is (are) High Blood Pressure ?,,NIHSeniorHealth,High Blood Pressure
";

#[test]
fn loads_question_and_answer_columns() {
    let dataset = Dataset::from_reader(MEDQUAD_SAMPLE.as_bytes(), "sample").expect("parse");

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.source(), "sample");
    assert_eq!(
        dataset.get(0),
        Some(&QaRecord {
            question: "What is (are) Glaucoma ?".to_string(),
            answer: "Glaucoma is a group of diseases that can damage the eye's optic nerve."
                .to_string(),
        })
    );
    assert!(dataset.records()[1].answer.contains("2.7 million"));
}

#[test]
fn skips_rows_with_blank_fields() {
    let dataset = Dataset::from_reader(MEDQUAD_SAMPLE.as_bytes(), "sample").expect("parse");
    assert!(
        dataset
            .records()
            .iter()
            .all(|r| !r.question.contains("High Blood Pressure"))
    );
}

#[test]
fn column_order_does_not_matter() {
    let csv = "answer,question\nA metabolic disease.,What is diabetes?\n";
    let dataset = Dataset::from_reader(csv.as_bytes(), "reordered").expect("parse");

    assert_eq!(dataset.records()[0].question, "What is diabetes?");
    assert_eq!(dataset.records()[0].answer, "A metabolic disease.");
}

#[test]
fn missing_column_is_an_error() {
    let csv = "question,response\nWhat is diabetes?,A metabolic disease.\n";
    let err = Dataset::from_reader(csv.as_bytes(), "bad").expect_err("should fail");

    assert!(matches!(err, DatasetError::MissingColumn("answer")));
}

#[test]
fn header_only_file_is_empty() {
    let err =
        Dataset::from_reader("question,answer\n".as_bytes(), "empty").expect_err("should fail");
    assert!(matches!(err, DatasetError::Empty(ref source) if source == "empty"));
}

#[test]
fn ragged_rows_are_malformed() {
    let csv = "question,answer\nWhat is diabetes?,A metabolic disease.,extra\n";
    let err = Dataset::from_reader(csv.as_bytes(), "ragged").expect_err("should fail");
    assert!(matches!(err, DatasetError::Csv(_)));
}

#[test]
fn load_from_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("medquad.csv");
    fs::write(&path, MEDQUAD_SAMPLE).expect("should write dataset");

    let dataset = Dataset::load(&path).expect("load");
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.source(), path.display().to_string());
}

#[test]
fn missing_file_is_an_error() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let err = Dataset::load(temp_dir.path().join("absent.csv")).expect_err("should fail");

    assert!(matches!(err, DatasetError::Open { .. }));
}

#[test]
fn clones_share_records() {
    let dataset = Dataset::from_records(
        vec![QaRecord {
            question: "q".to_string(),
            answer: "a".to_string(),
        }],
        "inline",
    )
    .expect("non-empty");
    let clone = dataset.clone();

    assert!(std::ptr::eq(dataset.records(), clone.records()));
}

#[test]
fn from_records_rejects_empty() {
    let err = Dataset::from_records(Vec::new(), "inline").expect_err("should fail");
    assert!(matches!(err, DatasetError::Empty(_)));
}
