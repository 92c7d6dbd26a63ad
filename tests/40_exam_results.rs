mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{id_of, token, TestServer};

async fn exam(server: &TestServer, auth: &str, system: &str, max_score: f64) -> Result<Value> {
    let level = server.level("Form 2", system, 2, None, false).await?;
    let class = server.class("school-a", 2025, &level, None).await?;
    let (status, body) = server
        .post(
            "/api/exams",
            auth,
            json!({
                "examName": "Mathematics Mid Term",
                "academicYear": 2025,
                "term": "TERM_2",
                "examType": "MIDTERM",
                "subject": { "id": uuid::Uuid::new_v4(), "academicSystem": system },
                "classId": id_of(&class)?,
                "maxScore": max_score
            }),
        )
        .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "exam create failed: {}", body);
    Ok(body["data"].clone())
}

#[tokio::test]
async fn results_are_graded_on_save() -> Result<()> {
    let server = TestServer::start_on(2025, 3, 1).await?;
    let teacher = token(&[], &["school-a"]);
    let exam = exam(&server, &teacher, "EIGHT_FOUR_FOUR", 100.0).await?;

    let cases = [(80.0, "A", 12), (79.9, "A_MINUS", 11), (0.0, "F", 0), (100.0, "A", 12)];
    for (marks, grade, points) in cases {
        let (status, body) = server
            .post(
                "/api/exam-results",
                &teacher,
                json!({
                    "exam": { "id": exam["id"] },
                    "student": uuid::Uuid::new_v4(),
                    "totalMarks": marks,
                    "grade": "E"
                }),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["grade"], grade, "marks {}", marks);
        assert_eq!(body["data"]["gradePoints"], points);
    }
    Ok(())
}

#[tokio::test]
async fn cbc_results_use_competency_levels() -> Result<()> {
    let server = TestServer::start_on(2025, 3, 1).await?;
    let teacher = token(&[], &["school-a"]);
    let exam = exam(&server, &teacher, "CBC", 50.0).await?;

    let (status, body) = server
        .post(
            "/api/exam-results",
            &teacher,
            json!({ "exam": exam["id"], "student": uuid::Uuid::new_v4(), "totalMarks": 36 }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["percentage"], 72.0);
    assert_eq!(body["data"]["grade"], "MEETING_EXPECTATIONS");

    let id = id_of(&body["data"])?;
    let (status, fetched) = server.get(&format!("/api/exam-results/{}", id), &teacher).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["grade"], "MEETING_EXPECTATIONS");
    Ok(())
}

#[tokio::test]
async fn marks_beyond_the_maximum_are_rejected() -> Result<()> {
    let server = TestServer::start_on(2025, 3, 1).await?;
    let teacher = token(&[], &["school-a"]);
    let exam = exam(&server, &teacher, "EIGHT_FOUR_FOUR", 50.0).await?;

    let (status, body) = server
        .post(
            "/api/exam-results",
            &teacher,
            json!({ "exam": exam["id"], "student": uuid::Uuid::new_v4(), "totalMarks": 75 }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    Ok(())
}
