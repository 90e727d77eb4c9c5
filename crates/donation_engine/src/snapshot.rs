use donation_core::{Amount, AmountError, DonationRecord};
use engine_logging::engine_debug;
use scraper::{ElementRef, Html, Selector};

use crate::{decode_page, FetchError, Fetcher, ReqwestFetcher};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("invalid table layout selector: {0}")]
    Layout(String),
    #[error("donor table #{0} not found on page")]
    TableMissing(String),
    #[error("donor table has no header row")]
    HeaderMissing,
    #[error("donor table has no {0:?} column")]
    MissingColumn(String),
    #[error("row {row} has {found} cells, expected at least {expected}")]
    ShortRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("row {row} has unreadable amount {text:?}: {source}")]
    InvalidAmount {
        row: usize,
        text: String,
        source: AmountError,
    },
}

/// Where the donor table lives in the page and how its columns are labelled.
///
/// Columns are found by header label rather than position because the
/// "Gift Aid" column is not always rendered.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub table_id: String,
    pub header_row_class: String,
    pub item_row_class: String,
    pub name_label: String,
    pub location_label: String,
    pub amount_label: String,
    pub message_label: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table_id: "ctl00_MainContent_UcFundraiserSponsors1_grdDonors".to_string(),
            header_row_class: "TableHeaderStyle".to_string(),
            item_row_class: "TableItemText".to_string(),
            name_label: "sponsor".to_string(),
            location_label: "location".to_string(),
            amount_label: "us$".to_string(),
            message_label: "message".to_string(),
        }
    }
}

struct Columns {
    name: usize,
    location: usize,
    amount: usize,
    message: usize,
}

impl Columns {
    fn widest(&self) -> usize {
        self.name.max(self.location).max(self.amount).max(self.message) + 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct DonorTableParser {
    layout: TableLayout,
}

impl DonorTableParser {
    pub fn new(layout: TableLayout) -> Self {
        Self { layout }
    }

    /// Extracts donation rows, freshest first (the page lists them oldest
    /// first, so row order is reversed).
    pub fn parse(&self, html: &str) -> Result<Vec<DonationRecord>, SnapshotError> {
        let doc = Html::parse_document(html);
        let table_sel = selector(&format!("#{}", self.layout.table_id))?;
        let header_sel = selector(&format!("tr.{}", self.layout.header_row_class))?;
        let item_sel = selector(&format!("tr.{}", self.layout.item_row_class))?;
        let header_cell_sel = selector("th, td")?;
        let cell_sel = selector("td")?;

        let table = doc
            .select(&table_sel)
            .next()
            .ok_or_else(|| SnapshotError::TableMissing(self.layout.table_id.clone()))?;
        let header = table
            .select(&header_sel)
            .next()
            .ok_or(SnapshotError::HeaderMissing)?;
        let labels: Vec<String> = header
            .select(&header_cell_sel)
            .map(|cell| cell_text(cell).to_lowercase())
            .collect();
        let columns = Columns {
            name: self.column(&labels, &self.layout.name_label)?,
            location: self.column(&labels, &self.layout.location_label)?,
            amount: self.column(&labels, &self.layout.amount_label)?,
            message: self.column(&labels, &self.layout.message_label)?,
        };

        let mut donations = Vec::new();
        for (row_idx, row) in table.select(&item_sel).enumerate() {
            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            // Placeholder rows pad the table when there are few donations.
            if cells.iter().all(String::is_empty) {
                continue;
            }
            if cells.len() < columns.widest() {
                return Err(SnapshotError::ShortRow {
                    row: row_idx,
                    found: cells.len(),
                    expected: columns.widest(),
                });
            }
            let amount_text = &cells[columns.amount];
            let amount = parse_amount_cell(amount_text).map_err(|source| {
                SnapshotError::InvalidAmount {
                    row: row_idx,
                    text: amount_text.clone(),
                    source,
                }
            })?;
            donations.push(DonationRecord::new(
                cells[columns.name].clone(),
                cells[columns.location].clone(),
                amount,
                cells[columns.message].clone(),
            ));
        }
        donations.reverse();
        engine_debug!("Parsed {} donation rows", donations.len());
        Ok(donations)
    }

    fn column(&self, labels: &[String], label: &str) -> Result<usize, SnapshotError> {
        labels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(label))
            .ok_or_else(|| SnapshotError::MissingColumn(label.to_string()))
    }
}

fn selector(css: &str) -> Result<Selector, SnapshotError> {
    Selector::parse(css).map_err(|err| SnapshotError::Layout(format!("{css}: {err}")))
}

/// Trimmed, non-empty text fragments of a cell joined by newlines, so `<br>`
/// separated message lines keep their breaks.
fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Amount cells carry a currency prefix such as `US$`. Only letters, `$`
/// and whitespace are stripped, so a sign reaches the amount parser and is
/// rejected there.
fn parse_amount_cell(text: &str) -> Result<Amount, AmountError> {
    text.trim()
        .trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '$' || c.is_whitespace())
        .parse()
}

#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<DonationRecord>, SnapshotError>;
}

#[async_trait::async_trait]
impl<T: SnapshotSource + ?Sized> SnapshotSource for &T {
    async fn snapshot(&self) -> Result<Vec<DonationRecord>, SnapshotError> {
        (**self).snapshot().await
    }
}

/// Live fundraiser page: fetch, decode and parse on every call.
pub struct PageSnapshotSource<F = ReqwestFetcher> {
    fetcher: F,
    url: String,
    parser: DonorTableParser,
}

impl<F: Fetcher> PageSnapshotSource<F> {
    pub fn new(fetcher: F, url: impl Into<String>, parser: DonorTableParser) -> Self {
        Self {
            fetcher,
            url: url.into(),
            parser,
        }
    }
}

#[async_trait::async_trait]
impl<F: Fetcher> SnapshotSource for PageSnapshotSource<F> {
    async fn snapshot(&self) -> Result<Vec<DonationRecord>, SnapshotError> {
        let output = self.fetcher.fetch(&self.url).await?;
        let html = decode_page(&output.bytes, output.metadata.content_type.as_deref());
        self.parser.parse(&html)
    }
}
