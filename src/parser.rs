use crate::address::AddressDecomposer;
use crate::constants::FACILITY_HEADER_LABEL;
use crate::error::{Result, ScraperError};
use crate::metrics::ParserMetrics;
use crate::types::FacilityRecord;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Compiled selectors for walking listing tables.
struct TableSelectors {
    table: Selector,
    row: Selector,
    cell: Selector,
}

impl TableSelectors {
    fn new() -> Self {
        Self {
            table: Selector::parse("table").expect("valid table selector"),
            row: Selector::parse("tr").expect("valid row selector"),
            cell: Selector::parse("th, td").expect("valid cell selector"),
        }
    }
}

/// Where each field sits in a facility table row.
///
/// Indices count from the first column after the skipped leading ones. The
/// upstream layout is assumed fixed; reordered columns are not detected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Header cell text identifying the facility table.
    pub header_label: String,
    /// Leading columns to drop, e.g. the row number.
    pub skip_leading_columns: usize,
    pub name: usize,
    pub municipality: usize,
    pub address: usize,
    pub zip_code: usize,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            header_label: FACILITY_HEADER_LABEL.to_string(),
            skip_leading_columns: 1,
            name: 0,
            municipality: 1,
            address: 2,
            zip_code: 3,
        }
    }
}

impl ColumnMapping {
    pub fn validate(&self) -> Result<()> {
        if self.header_label.trim().is_empty() {
            return Err(ScraperError::Config("table.header_label must not be empty".into()));
        }
        let mut indices = [self.name, self.municipality, self.address, self.zip_code];
        indices.sort_unstable();
        if indices.windows(2).any(|w| w[0] == w[1]) {
            return Err(ScraperError::Config(
                "table column indices must be distinct".into(),
            ));
        }
        Ok(())
    }

    /// Cells a row needs, after skipping, to fill every field.
    fn required_cells(&self) -> usize {
        [self.name, self.municipality, self.address, self.zip_code]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Turns a region's listing fragment into facility records.
#[derive(Debug, Clone)]
pub struct FacilityTableParser {
    mapping: ColumnMapping,
    decomposer: Arc<AddressDecomposer>,
}

impl Default for FacilityTableParser {
    fn default() -> Self {
        Self::new(ColumnMapping::default(), Arc::new(AddressDecomposer::default()))
    }
}

impl FacilityTableParser {
    pub fn new(mapping: ColumnMapping, decomposer: Arc<AddressDecomposer>) -> Self {
        Self { mapping, decomposer }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    #[instrument(skip(self, raw_html), fields(bytes = raw_html.len()))]
    pub fn parse(&self, region: &str, raw_html: &str) -> Result<Vec<FacilityRecord>> {
        let document = Html::parse_document(raw_html);
        let selectors = TableSelectors::new();

        let (rows, header_index) = document
            .select(&selectors.table)
            .find_map(|table| {
                let rows: Vec<ElementRef> = table.select(&selectors.row).collect();
                let header_index = rows
                    .iter()
                    .position(|row| self.is_header_row(&row_cells(row, &selectors.cell)))?;
                Some((rows, header_index))
            })
            .ok_or_else(|| ScraperError::UnparsableDocument {
                region: region.to_string(),
                reason: format!("no table with a '{}' header", self.mapping.header_label),
            })?;

        let mut records = Vec::new();
        for (i, row) in rows.iter().enumerate().skip(header_index + 1) {
            let cells = row_cells(row, &selectors.cell);
            match self.record_from_cells(region, &cells) {
                Some(record) => records.push(record),
                None => debug!(row = i, cells = cells.len(), "skipping row without facility data"),
            }
        }

        info!("Parsed {} facilities for {}", records.len(), region);
        ParserMetrics::record_parse_success(region, records.len());
        Ok(records)
    }

    fn is_header_row(&self, cells: &[String]) -> bool {
        let label = self.mapping.header_label.trim().to_lowercase();
        cells.iter().any(|cell| cell.to_lowercase() == label)
    }

    fn record_from_cells(&self, region: &str, cells: &[String]) -> Option<FacilityRecord> {
        let fields = cells.get(self.mapping.skip_leading_columns..)?;
        if fields.len() < self.mapping.required_cells() || fields.iter().all(|c| c.is_empty()) {
            return None;
        }

        let name = fields[self.mapping.name].clone();
        let municipality = fields[self.mapping.municipality].clone();
        let address = fields[self.mapping.address].clone();
        let zip_code = fields[self.mapping.zip_code].clone();

        let parts = self.decomposer.decompose(&address, &municipality, region);

        Some(FacilityRecord {
            name,
            municipality,
            address,
            zip_code,
            province: region.to_string(),
            building: parts.building,
            sub_locality: parts.sub_locality,
        })
    }
}

fn row_cells(row: &ElementRef, cell_selector: &Selector) -> Vec<String> {
    row.select(cell_selector)
        .map(|cell| normalize_text(&cell.text().collect::<String>()))
        .collect()
}

/// Collapse runs of whitespace (including non-breaking spaces) into single spaces.
pub fn normalize_text(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
