//! Persistence round-trips through real files.

use std::fs;

use cloze_similarity::embedding::{embedding_similarity, ExclusionPolicy, WordVectors};
use cloze_similarity::projection::{points, write_points_json, ProjectionPoint};
use cloze_similarity::table::{read_frame, read_similarity_matrix, write_similarity_matrix};
use cloze_similarity::{AnalysisError, AnswerRecord, SimilarityMatrix};
use tempfile::TempDir;

#[test]
fn test_similarity_matrix_roundtrip_keeps_nan_and_duplicate_labels() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("m.csv");

    let labels = vec!["býk".to_string(), "býk".to_string(), "bylina".to_string()];
    let matrix = SimilarityMatrix::new(
        labels,
        vec![1.0, 0.25, f64::NAN, 0.25, 1.0, -0.5, f64::NAN, -0.5, 1.0],
    )
    .unwrap();

    write_similarity_matrix(&path, &matrix).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with(",býk,býk,bylina"));

    let back = read_similarity_matrix(&path).unwrap();
    assert_eq!(back.labels(), matrix.labels());
    assert!(back.get(0, 2).is_nan());
    assert_eq!(back.get(1, 2), -0.5);
    assert_eq!(back.get(0, 1), 0.25);
}

#[test]
fn test_read_similarity_matrix_rejects_mislabelled_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, ",a,b\na,1,0\nx,0,1\n").unwrap();

    let err = read_similarity_matrix(&path).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidValue { .. }));
}

#[test]
fn test_read_frame_handles_quoted_delimiters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nova_doplnovacka_questions.csv");
    fs::write(
        &path,
        "id;question;correct\n1;\"[[\"\"text\"\",\"\"b_lina; léčivá\"\"]]\";y\n",
    )
    .unwrap();

    let frame = read_frame(&path, b';').unwrap();
    assert_eq!(frame.name(), "nova_doplnovacka_questions");
    assert_eq!(frame.len(), 1);
    assert_eq!(frame.cell(0, 1), r#"[["text","b_lina; léčivá"]]"#);
    assert_eq!(frame.cell(0, 2), "y");
}

#[test]
fn test_word_vectors_file_to_matrix() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vectors.txt");
    fs::write(&path, "3 2\nbylina 1 0\nbyt 0.5 0\nbýk 0 1\n").unwrap();

    let vectors = WordVectors::load(&path).unwrap();
    let words: Vec<String> = vec!["bylina".into(), "byt".into(), "bicí".into()];
    let outcome =
        embedding_similarity(&vectors, &words, &words, &ExclusionPolicy::default()).unwrap();

    assert_eq!(outcome.matrix.len(), 2);
    assert!((outcome.matrix.get(0, 1) - 1.0).abs() < 1e-9);
    assert_eq!(outcome.dropped.len(), 1);
    assert_eq!(outcome.dropped[0].word, "bicí");
}

#[test]
fn test_projection_points_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("points.json");
    let record = AnswerRecord {
        record_id: 1,
        user_id: 1,
        item_id: 10,
        is_correct: Some(true),
        question_template: Some("léčivá b_lina".into()),
        correct_answer: Some("y".into()),
        practice_set_id: Some(383),
        knowledge_component_id: Some(26),
        url: None,
        exercise: None,
    };

    let pts = points(&[0.5], &[-1.0], &[record], Some(&[2])).unwrap();
    write_points_json(&path, &pts).unwrap();

    let back: Vec<ProjectionPoint> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back, pts);
    assert_eq!(back[0].group, 2);
}
