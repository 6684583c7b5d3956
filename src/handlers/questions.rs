// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::exams::{attach_options, fetch_exam},
    models::question::{CreateQuestionRequest, Question, QuestionDraft, QuestionOption},
    services::import::{self, ImportFormat, ImportReport},
    utils::json::AppJson,
};

/// Stores one question and its options on the given connection.
/// Callers own the transaction.
pub async fn insert_question(
    conn: &mut PgConnection,
    exam_id: Option<i64>,
    draft: &QuestionDraft,
) -> Result<i64, sqlx::Error> {
    let question_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions (exam_id, text, subject, topic, difficulty, rationale, hint)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(exam_id)
    .bind(&draft.text)
    .bind(&draft.subject)
    .bind(&draft.topic)
    .bind(&draft.difficulty)
    .bind(&draft.rationale)
    .bind(&draft.hint)
    .fetch_one(&mut *conn)
    .await?;

    if !draft.options.is_empty() {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO options (question_id, text, is_correct) ");
        builder.push_values(&draft.options, |mut b, option| {
            b.push_bind(question_id)
                .push_bind(&option.text)
                .push_bind(option.is_correct);
        });
        builder.build().execute(&mut *conn).await?;
    }

    Ok(question_id)
}

/// Creates a single question by hand.
/// Admin only.
pub async fn create_question(
    State(pool): State<PgPool>,
    AppJson(payload): AppJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let (exam_id, draft) = payload.into_draft();
    if let Some(exam_id) = exam_id {
        fetch_exam(&pool, exam_id).await?;
    }

    let mut tx = pool.begin().await?;
    let id = insert_question(&mut tx, exam_id, &draft).await.map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Lists every question with its options, newest first.
/// Admin only.
pub async fn list_questions(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_id, text, subject, topic, difficulty, rationale, hint, created_at
        FROM questions
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::from(e)
    })?;

    let options = sqlx::query_as::<_, QuestionOption>(
        "SELECT id, question_id, text, is_correct FROM options ORDER BY id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(attach_options(questions, options)))
}

/// Form fields of an import upload.
struct ImportUpload {
    exam_id: i64,
    file: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<ImportUpload, AppError> {
    let mut file = None;
    let mut exam_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some(bytes.to_vec());
            }
            "examId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    let id = text
                        .parse::<i64>()
                        .map_err(|_| AppError::BadRequest("examId must be an integer".to_string()))?;
                    exam_id = Some(id);
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    let exam_id = exam_id.ok_or_else(|| {
        AppError::BadRequest("Please select an exam to attach these questions.".to_string())
    })?;

    Ok(ImportUpload { exam_id, file })
}

async fn run_import(
    pool: &PgPool,
    upload: ImportUpload,
    format: ImportFormat,
) -> Result<ImportReport, AppError> {
    fetch_exam(pool, upload.exam_id).await?;

    let table = import::read_table(&upload.file, format).map_err(|e| {
        tracing::warn!(exam_id = upload.exam_id, "Rejected import file: {}", e);
        AppError::from(e)
    })?;

    let mut report = ImportReport::default();
    let mut tx = pool.begin().await?;

    for row in import::normalize_table(&table) {
        match row.outcome {
            Ok(draft) => {
                let id = insert_question(&mut tx, Some(upload.exam_id), &draft)
                    .await
                    .map_err(|e| {
                        tracing::error!(row = row.row, "Failed to store imported question: {:?}", e);
                        AppError::from(e)
                    })?;
                report.record_imported(id);
            }
            Err(rejection) => {
                tracing::debug!(row = row.row, reason = rejection.reason.as_str(), "Row skipped");
                report.record_skipped(row.row, rejection);
            }
        }
    }

    tx.commit().await?;

    tracing::info!(
        exam_id = upload.exam_id,
        ?format,
        imported = report.imported,
        skipped = report.skipped,
        "Questions imported"
    );
    Ok(report)
}

/// Bulk import from a CSV upload.
/// Admin only.
pub async fn import_questions(
    State(pool): State<PgPool>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(multipart).await?;
    let report = run_import(&pool, upload, ImportFormat::Delimited).await?;
    Ok(Json(report))
}

/// Bulk import from an XLSX upload. Same row rules as CSV.
/// Admin only.
pub async fn import_excel(
    State(pool): State<PgPool>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(multipart).await?;
    let report = run_import(&pool, upload, ImportFormat::Spreadsheet).await?;
    Ok(Json(report))
}
