//! Session lifecycle commands

use std::path::Path;

use tracing::info;

use crate::client::{BulkImportApi, CreateOptions, JobHandle, SessionSummary};
use crate::error::{BulkImportError, Result};
use crate::prepare::Record;
use crate::retry::RetryPolicy;
use crate::upload::upload_file;

const LIST_COLUMNS: [&str; 9] = [
    "Name",
    "Table",
    "Status",
    "Frozen",
    "JobID",
    "Valid Parts",
    "Error Parts",
    "Valid Records",
    "Error Records",
];

fn count(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render sessions as a plain text table.
///
/// An `Organization` column leads the table when any session belongs to one.
pub fn render_sessions(sessions: &[SessionSummary]) -> String {
    let has_org = sessions.iter().any(|s| s.organization.is_some());

    let mut columns: Vec<&str> = Vec::with_capacity(LIST_COLUMNS.len() + 1);
    if has_org {
        columns.push("Organization");
    }
    columns.extend(LIST_COLUMNS);

    let rows: Vec<Vec<String>> = sessions
        .iter()
        .map(|s| {
            let mut row = Vec::with_capacity(columns.len());
            if has_org {
                row.push(s.organization.clone().unwrap_or_default());
            }
            row.extend([
                s.name.clone(),
                format!("{}.{}", s.database, s.table),
                capitalize(&s.status),
                if s.upload_frozen { "Frozen" } else { "" }.to_string(),
                s.job_id.clone().unwrap_or_default(),
                count(s.valid_parts),
                count(s.error_parts),
                count(s.valid_records),
                count(s.error_records),
            ]);
            row
        })
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    let mut lines = vec![format_row(&header)];
    lines.extend(rows.iter().map(|row| format_row(row)));
    lines.join("\n")
}

/// Render one session with its uploaded parts
pub fn render_session(session: &SessionSummary, parts: &[String]) -> String {
    let mut lines = vec![
        format!(
            "Organization : {}",
            session.organization.as_deref().unwrap_or_default()
        ),
        format!("Name         : {}", session.name),
        format!("Database     : {}", session.database),
        format!("Table        : {}", session.table),
        format!("Status       : {}", capitalize(&session.status)),
        format!("Frozen       : {}", session.upload_frozen),
        format!("JobID        : {}", session.job_id.as_deref().unwrap_or_default()),
        format!("Valid Records: {}", count(session.valid_records)),
        format!("Error Records: {}", count(session.error_records)),
        format!("Valid Parts  : {}", count(session.valid_parts)),
        format!("Error Parts  : {}", count(session.error_parts)),
        "Uploaded Parts :".to_string(),
    ];
    lines.extend(parts.iter().map(|p| format!("  {}", p)));
    lines.join("\n")
}

pub async fn list(client: &dyn BulkImportApi) -> Result<Vec<SessionSummary>> {
    let sessions = client.list_bulk_imports().await?;
    if sessions.is_empty() {
        info!("There are no bulk import sessions.");
    }
    Ok(sessions)
}

pub async fn create(
    client: &dyn BulkImportApi,
    name: &str,
    database: &str,
    table: &str,
    options: &CreateOptions,
) -> Result<()> {
    client
        .create_bulk_import(name, database, table, options)
        .await?;
    info!("Bulk import session '{}' is created.", name);
    Ok(())
}

pub async fn delete(client: &dyn BulkImportApi, name: &str) -> Result<()> {
    client.delete_bulk_import(name).await?;
    info!("Bulk import session '{}' is deleted.", name);
    Ok(())
}

/// Session summary plus its uploaded part names
pub async fn show(
    client: &dyn BulkImportApi,
    name: &str,
) -> Result<(SessionSummary, Vec<String>)> {
    let session = client.show_bulk_import(name).await?;
    let parts = client.list_bulk_import_parts(name).await?;
    Ok((session, parts))
}

/// Upload a single file under an explicit part name
pub async fn upload_part(
    client: &dyn BulkImportApi,
    retry: &RetryPolicy,
    session: &str,
    part_name: &str,
    path: &Path,
) -> Result<()> {
    upload_file(client, retry, session, path, part_name).await?;
    info!("Part '{}' is uploaded.", part_name);
    Ok(())
}

/// Delete parts, each name prefixed with `prefix`
pub async fn delete_parts(
    client: &dyn BulkImportApi,
    session: &str,
    prefix: &str,
    part_names: &[String],
) -> Result<()> {
    for part_name in part_names {
        let part_name = format!("{}{}", prefix, part_name);
        info!("Deleting '{}'...", part_name);
        client.delete_part(session, &part_name).await?;
    }
    info!("done.");
    Ok(())
}

/// Queue the perform job; sessions already performing or ready are refused
/// unless `force` is set
pub async fn perform(client: &dyn BulkImportApi, name: &str, force: bool) -> Result<JobHandle> {
    if !force {
        match client.show_bulk_import(name).await {
            Ok(session) if session.status == "performing" => {
                return Err(BulkImportError::InvalidState(format!(
                    "Bulk import session '{}' is already performing. Add '-f' option to force start.",
                    name
                )));
            }
            Ok(session) if session.status == "ready" => {
                return Err(BulkImportError::InvalidState(format!(
                    "Bulk import session '{}' is already ready to commit. Add '-f' option to force start.",
                    name
                )));
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }

    let job = client.perform_bulk_import(name).await?;
    info!("Job {} is queued.", job.job_id);
    Ok(job)
}

pub async fn commit(client: &dyn BulkImportApi, name: &str) -> Result<JobHandle> {
    let job = client.commit_bulk_import(name).await?;
    info!("Bulk import session '{}' started to commit.", name);
    Ok(job)
}

/// Records rejected by the last perform
pub async fn error_records(client: &dyn BulkImportApi, name: &str) -> Result<Vec<Record>> {
    let session = client.show_bulk_import(name).await?;
    if session.status == "uploading" || session.status == "performing" {
        return Err(BulkImportError::InvalidState(format!(
            "Bulk import session '{}' is not performed.",
            name
        )));
    }

    client.error_records(name).await?.collect()
}

pub async fn freeze(client: &dyn BulkImportApi, name: &str) -> Result<()> {
    client.freeze_bulk_import(name).await?;
    info!("Bulk import session '{}' is frozen.", name);
    Ok(())
}

pub async fn unfreeze(client: &dyn BulkImportApi, name: &str) -> Result<()> {
    client.unfreeze_bulk_import(name).await?;
    info!("Bulk import session '{}' is unfrozen.", name);
    Ok(())
}
