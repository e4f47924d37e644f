//! Row sources: built-in demo datasets and data files loaded through polars.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::column::ColumnDef;
use crate::domain::TVError;
use crate::table::RowActions;
use crate::value::{CellValue, parse_date};

// ------------------------------ demo datasets ------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Dataset {
    Users,
    Payments,
    Files,
    Plans,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub created_at: String,
    pub last_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub method: String,
    pub created_at: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileItem {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub size: u64,
    pub uploaded_at: String,
    pub uploader_name: String,
    pub uploader_email: String,
    pub mime_type: String,
}

fn user(id: &str, name: &str, role: &str, status: &str, created: &str, login: Option<&str>) -> User {
    let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
    User {
        id: id.to_string(),
        name: name.to_string(),
        email,
        role: role.to_string(),
        status: status.to_string(),
        created_at: created.to_string(),
        last_login: login.map(str::to_string),
    }
}

pub fn users() -> Vec<User> {
    vec![
        user("1", "Ali Ahmadi", "admin", "active", "2024-01-15T10:30:00Z", Some("2024-01-20T14:22:00Z")),
        user("2", "Fateme Mohammadi", "user", "active", "2024-01-10T09:15:00Z", Some("2024-01-19T11:45:00Z")),
        user("3", "Hassan Karimi", "moderator", "inactive", "2024-01-05T16:20:00Z", Some("2024-01-18T08:30:00Z")),
        user("4", "Zahra Rezaei", "user", "pending", "2024-01-12T12:45:00Z", None),
        user("5", "Mohammad Hosseini", "user", "active", "2024-01-08T14:10:00Z", Some("2024-01-20T09:15:00Z")),
        user("6", "Maryam Javadi", "user", "active", "2024-01-18T11:30:00Z", Some("2024-01-20T16:20:00Z")),
        user("7", "Reza Farahani", "moderator", "active", "2024-01-03T13:25:00Z", Some("2024-01-19T10:40:00Z")),
        user("8", "Sara Najafi", "user", "inactive", "2024-01-14T15:55:00Z", Some("2024-01-17T12:15:00Z")),
    ]
}

#[allow(clippy::too_many_arguments)]
fn payment(
    id: &str,
    user_id: &str,
    user_name: &str,
    amount: f64,
    status: &str,
    method: &str,
    created: &str,
    description: &str,
) -> Payment {
    Payment {
        id: id.to_string(),
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        amount,
        currency: "IRR".to_string(),
        status: status.to_string(),
        method: method.to_string(),
        created_at: created.to_string(),
        description: description.to_string(),
    }
}

pub fn payments() -> Vec<Payment> {
    vec![
        payment("PAY-001", "1", "Ali Ahmadi", 250000.0, "completed", "credit_card", "2024-01-20T10:30:00Z", "Monthly subscription"),
        payment("PAY-002", "2", "Fateme Mohammadi", 150000.0, "pending", "bank_transfer", "2024-01-19T14:22:00Z", "Service fee"),
        payment("PAY-003", "5", "Mohammad Hosseini", 500000.0, "completed", "digital_wallet", "2024-01-18T09:15:00Z", "Advanced bundle"),
        payment("PAY-004", "6", "Maryam Javadi", 75000.0, "failed", "credit_card", "2024-01-17T16:45:00Z", "Subscription renewal"),
        payment("PAY-005", "3", "Hassan Karimi", 320000.0, "refunded", "bank_transfer", "2024-01-16T11:20:00Z", "Purchase refund"),
        payment("PAY-006", "7", "Reza Farahani", 180000.0, "completed", "digital_wallet", "2024-01-15T13:30:00Z", "Extra services"),
        payment("PAY-007", "1", "Ali Ahmadi", 420000.0, "pending", "credit_card", "2024-01-14T08:45:00Z", "Yearly subscription"),
        payment("PAY-008", "8", "Sara Najafi", 95000.0, "completed", "bank_transfer", "2024-01-12T17:10:00Z", "Maintenance fee"),
    ]
}

fn file(id: &str, name: &str, kind: &str, size: u64, at: &str, uploader: &str, mime: &str) -> FileItem {
    let email = format!("{}@example.com", uploader.split(' ').next().unwrap_or(uploader).to_lowercase());
    FileItem {
        id: id.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        size,
        uploaded_at: at.to_string(),
        uploader_name: uploader.to_string(),
        uploader_email: email,
        mime_type: mime.to_string(),
    }
}

pub fn files() -> Vec<FileItem> {
    vec![
        file("1", "Design projects", "folder", 0, "2024-01-15T10:30:00Z", "Ali Ahmadi", "folder"),
        file("2", "Monthly report.pdf", "document", 2048576, "2024-01-14T14:20:00Z", "Sara Najafi", "application/pdf"),
        file("3", "Company logo.png", "image", 512000, "2024-01-13T09:15:00Z", "Maryam Javadi", "image/png"),
        file("4", "Product intro.mp4", "video", 52428800, "2024-01-12T16:45:00Z", "Hossein Rezaei", "video/mp4"),
        file("5", "Project archive.zip", "archive", 10485760, "2024-01-11T11:30:00Z", "Fateme Karimi", "application/zip"),
        file("6", "Background music.mp3", "audio", 3145728, "2024-01-10T13:20:00Z", "Amir Mohammadi", "audio/mp3"),
        file(
            "7",
            "Data sheet.xlsx",
            "document",
            1048576,
            "2024-01-09T08:45:00Z",
            "Zahra Ahmadi",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        file("8", "Team photo.jpg", "image", 2097152, "2024-01-08T15:10:00Z", "Mohammad Hosseini", "image/jpeg"),
    ]
}

pub fn format_currency(amount: f64, currency: &str) -> String {
    let grouped = group_thousands(amount);
    match currency {
        "IRR" => format!("{grouped} Toman"),
        "USD" => format!("${grouped}"),
        "EUR" => format!("€{grouped}"),
        other => format!("{grouped} {other}"),
    }
}

fn group_thousands(amount: f64) -> String {
    let digits = format!("{:.0}", amount.abs());
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if amount < 0.0 { format!("-{out}") } else { out }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let scaled = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exp])
}

fn status_label(status: &str) -> String {
    match status {
        "completed" => "Completed",
        "pending" => "Pending",
        "failed" => "Failed",
        "refunded" => "Refunded",
        "active" => "Active",
        "inactive" => "Inactive",
        other => other,
    }
    .to_string()
}

fn method_label(method: &str) -> String {
    match method {
        "credit_card" => "Credit card",
        "bank_transfer" => "Bank transfer",
        "digital_wallet" => "Digital wallet",
        other => other,
    }
    .to_string()
}

fn date(s: &str) -> CellValue {
    CellValue::date_or_text(s)
}

fn short_date(s: &str) -> String {
    parse_date(s)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| s.to_string())
}

pub fn user_columns() -> Vec<ColumnDef<User>> {
    vec![
        ColumnDef::new("id", |u: &User| u.id.clone().into()).header("ID").can_hide(false),
        ColumnDef::new("name", |u: &User| u.name.clone().into()).header("Name"),
        ColumnDef::new("email", |u: &User| u.email.clone().into()).header("Email"),
        ColumnDef::new("role", |u: &User| u.role.clone().into()).header("Role"),
        ColumnDef::new("status", |u: &User| u.status.clone().into())
            .header("Status")
            .render_with(|u| status_label(&u.status)),
        ColumnDef::new("created_at", |u: &User| date(&u.created_at))
            .header("Joined")
            .render_with(|u| short_date(&u.created_at)),
        ColumnDef::new("last_login", |u: &User| u.last_login.as_deref().map(date).unwrap_or(CellValue::Null))
            .header("Last login")
            .render_with(|u| u.last_login.as_deref().map(short_date).unwrap_or_else(|| "-".to_string())),
    ]
}

pub fn payment_columns() -> Vec<ColumnDef<Payment>> {
    vec![
        ColumnDef::new("id", |p: &Payment| p.id.clone().into()).header("ID").can_hide(false),
        ColumnDef::new("user_name", |p: &Payment| p.user_name.clone().into()).header("User"),
        ColumnDef::new("amount", |p: &Payment| p.amount.into())
            .header("Amount")
            .render_with(|p| format_currency(p.amount, &p.currency)),
        ColumnDef::new("currency", |p: &Payment| p.currency.clone().into()).header("Currency"),
        ColumnDef::new("status", |p: &Payment| p.status.clone().into())
            .header("Status")
            .render_with(|p| status_label(&p.status)),
        ColumnDef::new("method", |p: &Payment| p.method.clone().into())
            .header("Method")
            .render_with(|p| method_label(&p.method)),
        ColumnDef::new("description", |p: &Payment| p.description.clone().into())
            .header("Description")
            .size(24u16),
        ColumnDef::new("created_at", |p: &Payment| date(&p.created_at))
            .header("Date")
            .render_with(|p| short_date(&p.created_at)),
    ]
}

pub fn file_columns() -> Vec<ColumnDef<FileItem>> {
    vec![
        ColumnDef::new("id", |f: &FileItem| f.id.clone().into()).header("ID").can_hide(false),
        ColumnDef::new("name", |f: &FileItem| f.name.clone().into()).header("Name"),
        ColumnDef::new("type", |f: &FileItem| f.kind.clone().into()).header("Type"),
        ColumnDef::new("size", |f: &FileItem| f.size.into())
            .header("Size")
            .render_with(|f| format_file_size(f.size)),
        ColumnDef::new("uploaded_at", |f: &FileItem| date(&f.uploaded_at))
            .header("Uploaded")
            .render_with(|f| short_date(&f.uploaded_at)),
        ColumnDef::new("uploader_name", |f: &FileItem| f.uploader_name.clone().into()).header("Uploader"),
        ColumnDef::new("mime_type", |f: &FileItem| f.mime_type.clone().into())
            .header("MIME type")
            .can_filter(false),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub interval: String,
    pub features: Vec<String>,
    /// In GB
    pub storage_limit: u64,
    pub max_users: u32,
    pub backup_frequency: String,
    pub is_popular: bool,
    pub is_current_plan: bool,
}

#[allow(clippy::too_many_arguments)]
fn plan(
    id: &str,
    name: &str,
    price: f64,
    storage_limit: u64,
    max_users: u32,
    backup_frequency: &str,
    features: &[&str],
    is_popular: bool,
    is_current_plan: bool,
) -> Plan {
    Plan {
        id: id.to_string(),
        name: name.to_string(),
        price,
        currency: "IRR".to_string(),
        interval: "monthly".to_string(),
        features: features.iter().map(|f| f.to_string()).collect(),
        storage_limit,
        max_users,
        backup_frequency: backup_frequency.to_string(),
        is_popular,
        is_current_plan,
    }
}

pub fn plans() -> Vec<Plan> {
    vec![
        plan(
            "free",
            "Free",
            0.0,
            5,
            1,
            "weekly",
            &["5 GB storage", "Weekly backup", "Email support"],
            false,
            true,
        ),
        plan(
            "pro",
            "Pro",
            99000.0,
            100,
            5,
            "daily",
            &["100 GB storage", "Daily backup", "File versioning", "Priority support"],
            true,
            false,
        ),
        plan(
            "business",
            "Business",
            299000.0,
            2048,
            50,
            "hourly",
            &["2 TB storage", "Hourly backup", "Team management", "Dedicated support"],
            false,
            false,
        ),
    ]
}

/// "Free" for zero, otherwise the price per billing interval. Yearly billing
/// charges ten months.
pub fn format_plan_price(price: f64, currency: &str, yearly: bool) -> String {
    if price == 0.0 {
        return "Free".to_string();
    }
    if yearly {
        format!("{} / yearly", format_currency(price * 10.0, currency))
    } else {
        format!("{} / monthly", format_currency(price, currency))
    }
}

pub fn format_storage(storage_gb: u64) -> String {
    if storage_gb >= 1024 {
        format!("{:.1} TB", storage_gb as f64 / 1024.0)
    } else {
        format!("{storage_gb} GB")
    }
}

pub fn plan_columns() -> Vec<ColumnDef<Plan>> {
    vec![
        ColumnDef::new("id", |p: &Plan| p.id.clone().into()).header("ID").can_hide(false),
        ColumnDef::new("name", |p: &Plan| p.name.clone().into()).header("Plan"),
        ColumnDef::new("price", |p: &Plan| p.price.into())
            .header("Price")
            .render_with(|p| format_plan_price(p.price, &p.currency, p.interval == "yearly")),
        ColumnDef::new("interval", |p: &Plan| p.interval.clone().into()).header("Billing"),
        ColumnDef::new("storage_limit", |p: &Plan| p.storage_limit.into())
            .header("Storage")
            .render_with(|p| format_storage(p.storage_limit)),
        ColumnDef::new("max_users", |p: &Plan| (p.max_users as f64).into()).header("Users"),
        ColumnDef::new("backup_frequency", |p: &Plan| p.backup_frequency.clone().into()).header("Backup"),
        ColumnDef::new("features", |p: &Plan| p.features.join(", ").into())
            .header("Features")
            .size(32u16)
            .can_sort(false),
        ColumnDef::new("is_popular", |p: &Plan| p.is_popular.into())
            .header("Popular")
            .render_with(|p| if p.is_popular { "*".to_string() } else { String::new() }),
        ColumnDef::new("is_current_plan", |p: &Plan| p.is_current_plan.into())
            .header("Current")
            .render_with(|p| if p.is_current_plan { "current".to_string() } else { String::new() }),
    ]
}

// ------------------------------ dashboard stats ---------------------------- //

/// Headline numbers of the users and payments datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_users: usize,
    pub active_users: usize,
    pub total_payments: usize,
    pub completed_payments: usize,
    /// Sum of completed payment amounts
    pub total_revenue: f64,
}

impl DashboardStats {
    pub fn compute(users: &[User], payments: &[Payment]) -> Self {
        let completed = payments.iter().filter(|p| p.status == "completed");
        DashboardStats {
            total_users: users.len(),
            active_users: users.iter().filter(|u| u.status == "active").count(),
            total_payments: payments.len(),
            completed_payments: completed.clone().count(),
            total_revenue: completed.map(|p| p.amount).sum(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} users ({} active) | {}/{} payments completed | revenue {}",
            self.total_users,
            self.active_users,
            self.completed_payments,
            self.total_payments,
            format_currency(self.total_revenue, "IRR")
        )
    }
}

// -------------------------------- row actions ------------------------------ //

/// File manager actions. Deleting removes the file from the table.
pub struct FileActions;

impl RowActions<FileItem> for FileActions {
    fn view(&mut self, row: &FileItem) -> Option<String> {
        Some(format!("Viewing {} ({}, {})", row.name, row.mime_type, format_file_size(row.size)))
    }

    fn download(&mut self, row: &FileItem) -> Option<String> {
        info!("Download requested for file {}", row.id);
        Some(format!("Download of {} started", row.name))
    }

    fn delete(&mut self, row: &FileItem) -> Option<String> {
        info!("Deleting file {}", row.id);
        Some(format!("{} deleted", row.name))
    }
}

pub struct PaymentActions;

impl RowActions<Payment> for PaymentActions {
    fn view(&mut self, row: &Payment) -> Option<String> {
        Some(format!(
            "{}: {} by {}, {}",
            row.id,
            format_currency(row.amount, &row.currency),
            row.user_name,
            row.description
        ))
    }

    /// Only failed payments can be retried.
    fn retry(&mut self, row: &Payment) -> Option<String> {
        if row.status != "failed" {
            return Some(format!("{} is {}, nothing to retry", row.id, row.status));
        }
        info!("Retrying payment {}", row.id);
        Some(format!("Retrying payment {}", row.id))
    }
}

pub struct UserActions;

impl RowActions<User> for UserActions {
    fn view(&mut self, row: &User) -> Option<String> {
        Some(format!("{} <{}>, {} since {}", row.name, row.email, row.role, short_date(&row.created_at)))
    }
}

// -------------------------------- data files ------------------------------- //

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    XLSX,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// A row of a loaded data file.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: String,
    pub values: Vec<CellValue>,
}

/// Rows and column definitions built from a data file's schema.
pub struct LoadedFile {
    pub name: String,
    pub records: Vec<Record>,
    pub columns: Vec<ColumnDef<Record>>,
}

fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("XLSX") => Ok(FileType::XLSX),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TVError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound,
        ErrorKind::PermissionDenied => TVError::PermissionDenied,
        _ => TVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TVError::LoadingFailed("Not a file!".into()));
    }
    let file_type = detect_file_type(&path)?;
    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Converts one frame column into cell values according to its dtype.
fn load_column(df: &DataFrame, name: &str) -> Result<Vec<CellValue>, PolarsError> {
    let column = df.column(name)?;
    let dtype = column.dtype().clone();

    let values = if is_numeric_type(&dtype) {
        let col = column.cast(&DataType::Float64)?;
        col.f64()?.into_iter().map(|v| v.into()).collect()
    } else if dtype == DataType::Boolean {
        column.bool()?.into_iter().map(|v| v.into()).collect()
    } else {
        let temporal = dtype.is_temporal();
        let col = column.cast(&DataType::String)?;
        col.str()?
            .into_iter()
            .map(|v| match v {
                Some(s) if temporal => CellValue::date_or_text(s),
                Some(s) => CellValue::text(s),
                None => CellValue::Null,
            })
            .collect()
    };
    Ok(values)
}

fn record_columns(names: &[String]) -> Vec<ColumnDef<Record>> {
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            ColumnDef::new(name.clone(), move |r: &Record| {
                r.values.get(idx).cloned().unwrap_or(CellValue::Null)
            })
        })
        .collect()
}

// An id column only identifies rows when every value is present and distinct.
fn usable_as_key(values: &[CellValue]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    let usable = values.iter().all(|v| !v.is_missing() && seen.insert(v.to_text()));
    if !usable {
        debug!("Column \"id\" has missing or duplicate values, keying rows by number");
    }
    usable
}

/// Loads a CSV, Parquet or Arrow IPC file into records.
///
/// Columns are converted in parallel. Records are keyed by their `id` column
/// when its values are present and unique, otherwise by 1-based row number.
pub fn load_data_file(path: PathBuf) -> Result<LoadedFile, TVError> {
    let file_info = get_file_info(path)?;
    debug!("Loading {:?} ({} bytes)", file_info.path, file_info.file_size);
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
        FileType::XLSX => {
            return Err(TVError::LoadingFailed("xlsx input is not supported".into()));
        }
    };

    let start_time = Instant::now();
    let df = Arc::new(frame.collect()?);
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();

    let columns: Result<Vec<Vec<CellValue>>, PolarsError> =
        names.par_iter().map(|name| load_column(&df, name)).collect();
    let columns = columns?;

    let nrows = df.height();
    let id_column = names
        .iter()
        .position(|n| n == "id")
        .filter(|&cidx| usable_as_key(&columns[cidx]));
    let records = (0..nrows)
        .map(|ridx| {
            let values: Vec<CellValue> = columns.iter().map(|c| c[ridx].clone()).collect();
            let key = match id_column {
                Some(cidx) => values[cidx].to_text(),
                None => (ridx + 1).to_string(),
            };
            Record { key, values }
        })
        .collect();

    info!(
        "Loaded {} rows x {} columns in {}ms",
        nrows,
        names.len(),
        start_time.elapsed().as_millis()
    );

    let name = file_info
        .path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();

    Ok(LoadedFile {
        name,
        records,
        columns: record_columns(&names),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn payment_statuses_match_the_mock_data() {
        let p = payments();
        let count = |s: &str| p.iter().filter(|x| x.status == s).count();
        assert_eq!(p.len(), 8);
        assert_eq!(count("completed"), 4);
        assert_eq!(count("pending"), 2);
        assert_eq!(count("failed"), 1);
        assert_eq!(count("refunded"), 1);
    }

    #[test]
    fn renderers_format_but_accessors_stay_raw() {
        let cols = payment_columns();
        let p = &payments()[0];
        let amount = cols.iter().find(|c| c.id() == "amount").unwrap();
        assert_eq!(amount.render(p), "250,000 Toman");
        assert_eq!(amount.value(p), CellValue::Number(250000.0));
    }

    #[test]
    fn missing_last_login_is_null() {
        let cols = user_columns();
        let u = &users()[3];
        let login = cols.iter().find(|c| c.id() == "last_login").unwrap();
        assert_eq!(login.value(u), CellValue::Null);
        assert_eq!(login.render(u), "-");
    }

    #[test]
    fn file_sizes_are_human_readable() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512000), "500 KB");
        assert_eq!(format_file_size(2048576), "1.95 MB");
        assert_eq!(format_file_size(52428800), "50 MB");
    }

    #[test]
    fn currency_grouping() {
        assert_eq!(format_currency(1500.0, "USD"), "$1,500");
        assert_eq!(format_currency(95000.0, "IRR"), "95,000 Toman");
        assert_eq!(format_currency(100.0, "EUR"), "€100");
    }

    #[test]
    fn dashboard_stats_over_mock_data() {
        let stats = DashboardStats::compute(&users(), &payments());
        assert_eq!(stats.total_users, 8);
        assert_eq!(stats.active_users, 5);
        assert_eq!(stats.completed_payments, 4);
        assert_eq!(stats.total_revenue, 1025000.0);
        assert_eq!(
            stats.summary(),
            "8 users (5 active) | 4/8 payments completed | revenue 1,025,000 Toman"
        );
    }

    #[test]
    fn plan_prices_and_storage() {
        let p = plans();
        let cols = plan_columns();
        let price = cols.iter().find(|c| c.id() == "price").unwrap();
        let storage = cols.iter().find(|c| c.id() == "storage_limit").unwrap();
        assert_eq!(price.render(&p[0]), "Free");
        assert_eq!(price.render(&p[1]), "99,000 Toman / monthly");
        assert_eq!(format_plan_price(99000.0, "IRR", true), "990,000 Toman / yearly");
        assert_eq!(storage.render(&p[1]), "100 GB");
        assert_eq!(storage.render(&p[2]), "2.0 TB");
        assert_eq!(p.iter().filter(|p| p.is_current_plan).count(), 1);
    }

    #[test]
    fn file_and_payment_actions_report_back() {
        let f = &files()[1];
        let mut actions = FileActions;
        assert_eq!(actions.download(f).as_deref(), Some("Download of Monthly report.pdf started"));
        assert_eq!(actions.delete(f).as_deref(), Some("Monthly report.pdf deleted"));
        assert_eq!(actions.retry(f), None);

        let p = payments();
        let mut actions = PaymentActions;
        assert_eq!(actions.retry(&p[3]).as_deref(), Some("Retrying payment PAY-004"));
        assert_eq!(actions.retry(&p[0]).as_deref(), Some("PAY-001 is completed, nothing to retry"));
        assert_eq!(actions.delete(&p[0]), None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(detect_file_type(Path::new("a.txt")), Err(TVError::UnknownFileType)));
        assert!(matches!(detect_file_type(Path::new("a.PQ")), Ok(FileType::PARQUET)));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_data_file(PathBuf::from("/definitely/not/here.csv"));
        assert!(matches!(err, Err(TVError::FileNotFound)));
    }

    #[test]
    fn loads_csv_with_typed_columns() {
        let path = std::env::temp_dir().join("dashtable-source-test.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "id,name,amount").unwrap();
        writeln!(f, "PAY-001,Ali,250000").unwrap();
        writeln!(f, "PAY-002,Fateme,").unwrap();
        drop(f);

        let loaded = load_data_file(path.clone()).unwrap();
        fs::remove_file(path).unwrap();

        assert_eq!(loaded.name, "dashtable-source-test.csv");
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].key, "PAY-001");
        let amount = &loaded.columns[2];
        assert_eq!(amount.id(), "amount");
        assert_eq!(amount.value(&loaded.records[0]), CellValue::Number(250000.0));
        assert_eq!(amount.value(&loaded.records[1]), CellValue::Null);
    }

    #[test]
    fn duplicate_or_missing_ids_fall_back_to_row_numbers() {
        let path = std::env::temp_dir().join("dashtable-source-dup-ids.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "id,name").unwrap();
        writeln!(f, "7,Ali").unwrap();
        writeln!(f, "7,Sara").unwrap();
        writeln!(f, ",Reza").unwrap();
        drop(f);

        let loaded = load_data_file(path.clone()).unwrap();
        fs::remove_file(path).unwrap();

        let keys: Vec<&str> = loaded.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
    }
}
