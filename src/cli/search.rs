//! Search command: query the remote database and print a table
//!
//! Nothing is written to disk. `--type vendor` and `--type product` list lookup
//! labels and values (the values feed `--vendor` / `--product`); `--type vuln`
//! prints one listing page, expanded to details unless `--short` is given.

use super::{Cli, CliError};
use crate::fetcher::cnnvd_config::{FIRST_PAGE, MAX_PAGE_SIZE};
use crate::fetcher::{DetailExpander, ListRequest, LookupKind, PageWalker, RetryPolicy, VulnSource};
use crate::{HazardLevel, Record, Taxonomy};
use clap::{Args, ValueEnum};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::ProgressBar;
use tracing::info;

/// What to search for
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchKind {
    /// Vulnerabilities
    Vuln,
    /// Vendors
    Vendor,
    /// Products
    Product,
}

/// Search command arguments
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// What to search for
    #[arg(short = 't', long = "type", value_enum, default_value = "vuln")]
    pub kind: SearchKind,

    /// Search keyword
    #[arg(short, long, default_value = "")]
    pub keyword: String,

    /// Page to fetch (vuln only)
    #[arg(long, default_value_t = FIRST_PAGE, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_index: u32,

    /// Records per page (vuln only, max 50)
    #[arg(long, default_value_t = MAX_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub page_size: u32,

    /// Hazard level filter: 超危, 高危, 中危, 低危 or critical, high, medium, low (vuln only)
    #[arg(long)]
    pub hazard_level: Option<HazardLevel>,

    /// Vendor filter, a value from `search --type vendor` (vuln only)
    #[arg(long)]
    pub vendor: Option<String>,

    /// Product filter, a value from `search --type product` (vuln only)
    #[arg(long)]
    pub product: Option<String>,

    /// Print list entries without fetching each detail (vuln only)
    #[arg(long, default_value_t = false)]
    pub short: bool,
}

/// One row of the vulnerability table
#[derive(Debug, Clone, PartialEq)]
pub struct VulnRow {
    /// Hazard level code
    pub hazard_level: Option<u8>,
    /// CNNVD identifier
    pub cnnvd_code: String,
    /// CVE identifier
    pub cve_code: String,
    /// Vulnerability name
    pub name: String,
    /// Vulnerability type
    pub vul_type: String,
    /// Affected vendor
    pub vendor: String,
    /// Affected product
    pub product: String,
    /// Last update time
    pub update_time: String,
}

impl From<&Record> for VulnRow {
    fn from(record: &Record) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        match record {
            Record::Summary(s) => VulnRow {
                hazard_level: s.hazard_level,
                cnnvd_code: s.cnnvd_code.clone(),
                cve_code: text(&s.cve_code),
                name: text(&s.vul_name),
                vul_type: s.vul_type.clone(),
                vendor: String::new(),
                product: String::new(),
                update_time: text(&s.update_time),
            },
            Record::Detail(d) => VulnRow {
                hazard_level: d.hazard_level,
                cnnvd_code: d.cnnvd_code.clone(),
                cve_code: text(&d.cve_code),
                name: text(&d.vul_name),
                vul_type: d
                    .vul_type_name
                    .clone()
                    .or_else(|| d.vul_type.clone())
                    .unwrap_or_default(),
                vendor: text(&d.affected_vendor),
                product: text(&d.affected_product),
                update_time: text(&d.update_time),
            },
        }
    }
}

impl SearchArgs {
    /// Execute the search command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let source = cli.source()?;
        let retry = RetryPolicy::new(cli.retry);

        match self.kind {
            SearchKind::Vendor => self.search_lookup(&source, retry, LookupKind::Vendor).await,
            SearchKind::Product => self.search_lookup(&source, retry, LookupKind::Product).await,
            SearchKind::Vuln => self.search_vulns(&source, retry, cli.verbose).await,
        }
    }

    async fn search_lookup<S: VulnSource>(
        &self,
        source: &S,
        retry: RetryPolicy,
        kind: LookupKind,
    ) -> Result<(), CliError> {
        let keyword = Some(self.keyword.as_str()).filter(|k| !k.is_empty());
        let operation = format!("lookup {kind} keyword={}", self.keyword);
        let values = retry
            .run(&operation, || source.lookup(kind, keyword))
            .await?;

        if values.is_empty() {
            info!(kind = %kind, keyword = %self.keyword, "there is no record");
            return Ok(());
        }
        println!("{}", taxonomy_table(&values));
        Ok(())
    }

    async fn search_vulns<S: VulnSource>(
        &self,
        source: &S,
        retry: RetryPolicy,
        verbose: bool,
    ) -> Result<(), CliError> {
        let request = ListRequest {
            page_index: self.page_index,
            page_size: self.page_size,
            keyword: self.keyword.clone(),
            hazard_level: self.hazard_level.map(|level| level.code()),
            vendor: self.vendor.clone(),
            product: self.product.clone(),
        };
        let page = PageWalker::new(source, retry, self.page_size)
            .fetch_list(&request)
            .await?;
        info!(request = %request, total = page.total, "Search returned");

        if page.records.is_empty() {
            info!(request = %request, "there is no record");
            return Ok(());
        }

        let expander = DetailExpander::new(source, retry, !self.short);
        let progress = if verbose || self.short {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(page.records.len() as u64)
        };

        let mut rows = Vec::with_capacity(page.records.len());
        for summary in page.records {
            let record = expander.expand(summary).await?;
            rows.push(VulnRow::from(&record));
            progress.inc(1);
        }
        progress.finish_and_clear();

        println!("{}", vuln_table(&rows));
        Ok(())
    }
}

/// LABEL / VALUE table of a lookup result
pub fn taxonomy_table(values: &[Taxonomy]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![header_cell("LABEL"), header_cell("VALUE")]);
    for value in values {
        table.add_row(vec![Cell::new(&value.label), Cell::new(value.value_text())]);
    }
    table
}

/// Vulnerability table with severity-coloured cells
pub fn vuln_table(rows: &[VulnRow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            [
                "SEVERITY",
                "CNNVD ID",
                "CVE ID",
                "NAME",
                "TYPE",
                "VENDOR",
                "PRODUCT",
                "UPDATE TIME",
            ]
            .into_iter()
            .map(header_cell)
            .collect::<Vec<_>>(),
        );
    for row in rows {
        table.add_row(vec![
            severity_cell(row.hazard_level),
            Cell::new(&row.cnnvd_code),
            Cell::new(&row.cve_code),
            Cell::new(&row.name),
            Cell::new(&row.vul_type),
            Cell::new(&row.vendor),
            Cell::new(&row.product),
            Cell::new(&row.update_time),
        ]);
    }
    table
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn severity_cell(code: Option<u8>) -> Cell {
    let color = match code.and_then(HazardLevel::from_code) {
        Some(HazardLevel::Critical) => Color::Red,
        Some(HazardLevel::High) => Color::DarkRed,
        Some(HazardLevel::Medium) => Color::Yellow,
        Some(HazardLevel::Low) => Color::Blue,
        None => Color::Grey,
    };
    Cell::new(HazardLevel::label_for(code))
        .fg(color)
        .add_attribute(Attribute::Bold)
}
