mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{id_of, token, TestServer};

#[tokio::test]
async fn batch_evaluates_students_and_records_the_caller() -> Result<()> {
    let server = TestServer::start_on(2025, 11, 30).await?;
    let grade9 = server.level("Grade 9", "CBC", 9, None, false).await?;
    let grade8 = server.level("Grade 8", "CBC", 8, Some(&grade9), false).await?;
    let admin = token(&[], &["school-a"]);

    let (status, body) = server
        .post(
            "/api/promotion-batches",
            &admin,
            json!({
                "name": "Grade 8 to Grade 9",
                "fromAcademicYear": 2025,
                "toAcademicYear": 2026,
                "fromLevel": grade8,
                "toLevel": grade9,
                "promotedBy": uuid::Uuid::new_v4(),
                "rules": { "promotionCriteria": "COMBINED" },
                "students": [
                    { "student": uuid::Uuid::new_v4(), "attendance": 95, "averageScore": 72 },
                    { "student": uuid::Uuid::new_v4(), "attendance": 60, "averageScore": 72 },
                    { "student": uuid::Uuid::new_v4(), "attendance": 50, "averageScore": 20, "failedSubjects": 6 }
                ]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let batch = &body["data"];
    assert_eq!(batch["status"], "COMPLETED");
    assert_eq!(batch["tenant"], "school-a");
    assert_eq!(batch["totalStudents"], 3);
    assert_eq!(batch["promotedCount"], 1);
    assert_eq!(batch["retainedCount"], 1);
    assert_eq!(batch["studentDetails"][1]["status"], "CONDITIONAL");
    assert_eq!(batch["promotionDate"], "2025-11-30");

    let (status, fetched) = server
        .get(&format!("/api/promotion-batches/{}", id_of(batch)?), &admin)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["promotedBy"], batch["promotedBy"]);
    assert_ne!(batch["promotedBy"], json!(null));
    Ok(())
}

#[tokio::test]
async fn batch_years_must_be_consecutive() -> Result<()> {
    let server = TestServer::start_on(2025, 11, 30).await?;
    let form2 = server.level("Form 2", "EIGHT_FOUR_FOUR", 2, None, false).await?;
    let form1 = server.level("Form 1", "EIGHT_FOUR_FOUR", 1, Some(&form2), false).await?;

    let (status, body) = server
        .post(
            "/api/promotion-batches",
            &token(&[], &["school-a"]),
            json!({
                "name": "Skip a year",
                "fromAcademicYear": 2025,
                "toAcademicYear": 2027,
                "fromLevel": form1,
                "toLevel": form2,
                "students": []
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}
