//! Historical price tables: CSV loading, gap filling, merging fetched series.
//!
//! The file layout is one `timestamp` column followed by one column per asset
//! named by its pair (`THB_XRP`), e.g.
//!
//! ```text
//! timestamp,THB_XRP,THB_SAND
//! 2024-01-01 00:00:00,18.2,15.1
//! 2024-01-02 00:00:00,,15.3
//! ```
//!
//! Blank or unparseable cells are forward-filled from the previous row, then
//! any leading gap is back-filled from the first known value.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use rustc_hash::FxHashMap;
use thbfolio::{PricePoint, Symbol, TargetAllocation, Timestamp, pair_name, parse_pair};

use crate::error::{Error, Result};

/// Timestamp layout used in price files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Gap-filled prices, one column per asset, rows in ascending time.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    cash: Symbol,
    assets: Vec<Symbol>,
    timestamps: Vec<Timestamp>,
    /// `columns[i][row]` is the price of `assets[i]` at `timestamps[row]`.
    /// `None` only survives filling when a column has no value at all.
    columns: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table from raw columns, filling gaps.
    ///
    /// Timestamps must be strictly ascending and every column as long as
    /// `timestamps`.
    pub fn new(
        cash: Symbol,
        assets: Vec<Symbol>,
        timestamps: Vec<Timestamp>,
        mut columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if timestamps.is_empty() {
            return Err(Error::History("price table has no rows".into()));
        }
        if assets.len() != columns.len() || columns.iter().any(|c| c.len() != timestamps.len()) {
            return Err(Error::History("ragged price table".into()));
        }
        for (i, pair) in timestamps.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(Error::History(format!(
                    "row {} at {} is not after {}",
                    i + 2,
                    pair[1],
                    pair[0]
                )));
            }
        }
        for (i, asset) in assets.iter().enumerate() {
            if assets[..i].contains(asset) {
                return Err(Error::History(format!("duplicate column for {asset}")));
            }
        }

        for column in &mut columns {
            fill_gaps(column);
        }

        Ok(Self {
            cash,
            assets,
            timestamps,
            columns,
        })
    }

    pub fn cash(&self) -> Symbol {
        self.cash
    }

    /// Assets in column order.
    pub fn assets(&self) -> &[Symbol] {
        &self.assets
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, asset: Symbol) -> Option<&[Option<f64>]> {
        self.assets
            .iter()
            .position(|&a| a == asset)
            .map(|i| self.columns[i].as_slice())
    }

    /// Every non-cash target asset must have a column.
    pub fn validate_targets(&self, targets: &TargetAllocation) -> Result<()> {
        for (asset, _) in targets.assets() {
            if !self.assets.contains(&asset) {
                return Err(Error::Config(format!(
                    "no price column {} for target asset {asset}",
                    pair_name(self.cash, asset)
                )));
            }
        }
        Ok(())
    }

    /// One price point per row, in time order.
    pub fn points(&self) -> Vec<PricePoint> {
        (0..self.timestamps.len())
            .map(|row| {
                let mut point = PricePoint::new(self.timestamps[row]);
                for (asset, column) in self.assets.iter().zip(&self.columns) {
                    if let Some(price) = column[row] {
                        point.set(*asset, price);
                    }
                }
                point
            })
            .collect()
    }

    /// Write the table in the layout [`load_price_table`] reads.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["timestamp".to_string()];
        header.extend(self.assets.iter().map(|&a| pair_name(self.cash, a)));
        writer.write_record(&header)?;

        for (row, ts) in self.timestamps.iter().enumerate() {
            let mut record = vec![ts.format(TIMESTAMP_FORMAT).to_string()];
            record.extend(
                self.columns
                    .iter()
                    .map(|c| c[row].map(|p| p.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        info!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }
}

/// Read a price CSV. Column headers are pair names whose cash leg must be
/// `cash` (`THB_XRP`), or bare asset codes (`XRP`).
pub fn load_price_table(path: &Path, cash: Symbol) -> Result<PriceTable> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut assets = Vec::with_capacity(headers.len().saturating_sub(1));
    for name in headers.iter().skip(1) {
        assets.push(column_asset(name, cash)?);
    }

    let mut timestamps = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); assets.len()];
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let raw_ts = record.get(0).unwrap_or_default();
        let ts = parse_timestamp(raw_ts).ok_or_else(|| {
            Error::History(format!("row {}: bad timestamp {raw_ts:?}", i + 2))
        })?;
        timestamps.push(ts);
        for (col, column) in columns.iter_mut().enumerate() {
            column.push(record.get(col + 1).and_then(parse_price));
        }
    }

    debug!(
        "Loaded {} rows x {} assets from {}",
        timestamps.len(),
        assets.len(),
        path.display()
    );
    PriceTable::new(cash, assets, timestamps, columns)
}

/// Outer-join per-asset `(timestamp, close)` series on timestamp, then fill gaps.
pub fn merge_series(cash: Symbol, series: Vec<(Symbol, Vec<(Timestamp, f64)>)>) -> Result<PriceTable> {
    let all: BTreeSet<Timestamp> = series
        .iter()
        .flat_map(|(_, s)| s.iter().map(|&(ts, _)| ts))
        .collect();
    let timestamps: Vec<Timestamp> = all.into_iter().collect();

    let mut assets = Vec::with_capacity(series.len());
    let mut columns = Vec::with_capacity(series.len());
    for (asset, points) in series {
        let by_ts: FxHashMap<Timestamp, f64> = points.into_iter().collect();
        columns.push(
            timestamps
                .iter()
                .map(|ts| by_ts.get(ts).copied().filter(|p| p.is_finite() && *p > 0.0))
                .collect(),
        );
        assets.push(asset);
    }

    PriceTable::new(cash, assets, timestamps, columns)
}

fn column_asset(name: &str, cash: Symbol) -> Result<Symbol> {
    match parse_pair(name) {
        Some((quote, asset)) if quote == cash => Ok(asset),
        Some(_) => Err(Error::History(format!(
            "column {name:?} is not quoted in {cash}"
        ))),
        None => Symbol::try_new(name)
            .ok_or_else(|| Error::History(format!("unrecognised column {name:?}"))),
    }
}

fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|p| p.is_finite() && *p > 0.0)
}

/// Forward-fill, then back-fill the leading gap.
fn fill_gaps(column: &mut [Option<f64>]) {
    let mut last = None;
    for cell in column.iter_mut() {
        match cell {
            Some(v) => last = Some(*v),
            None => *cell = last,
        }
    }
    if let Some(first) = column.iter().flatten().next().copied() {
        for cell in column.iter_mut().take_while(|c| c.is_none()) {
            *cell = Some(first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thb() -> Symbol {
        Symbol::new("THB")
    }

    fn ts(s: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn write(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn fill_gaps_forward_then_back() {
        let mut column = vec![None, Some(2.0), None, Some(4.0), None];
        fill_gaps(&mut column);
        assert_eq!(column, vec![Some(2.0), Some(2.0), Some(2.0), Some(4.0), Some(4.0)]);

        let mut empty: Vec<Option<f64>> = vec![None, None];
        fill_gaps(&mut empty);
        assert_eq!(empty, vec![None, None]);
    }

    #[test]
    fn load_fills_blank_cells() {
        let file = write(
            "timestamp,THB_XRP,THB_SAND\n\
             2024-01-01 00:00:00,,15.0\n\
             2024-01-02 00:00:00,18.5,\n\
             2024-01-03 00:00:00,19.0,n/a\n",
        );
        let table = load_price_table(file.path(), thb()).unwrap();
        assert_eq!(table.assets(), &[Symbol::new("XRP"), Symbol::new("SAND")]);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.column(Symbol::new("XRP")).unwrap(),
            &[Some(18.5), Some(18.5), Some(19.0)]
        );
        assert_eq!(
            table.column(Symbol::new("SAND")).unwrap(),
            &[Some(15.0), Some(15.0), Some(15.0)]
        );

        let points = table.points();
        assert_eq!(points[0].timestamp, ts("2024-01-01 00:00:00"));
        assert_eq!(points[2].price(Symbol::new("XRP")), Some(19.0));
    }

    #[test]
    fn bare_symbol_headers_and_date_only_rows() {
        let file = write("timestamp,BTC\n2024-01-01,1500000\n");
        let table = load_price_table(file.path(), thb()).unwrap();
        assert_eq!(table.assets(), &[Symbol::new("BTC")]);
        assert_eq!(table.timestamps()[0], ts("2024-01-01 00:00:00"));
    }

    #[test]
    fn unordered_rows_rejected() {
        let file = write(
            "timestamp,THB_XRP\n\
             2024-01-02 00:00:00,18.0\n\
             2024-01-01 00:00:00,18.5\n",
        );
        let err = load_price_table(file.path(), thb()).unwrap_err();
        assert!(matches!(err, Error::History(_)));
    }

    #[test]
    fn empty_file_rejected() {
        let file = write("timestamp,THB_XRP\n");
        assert!(matches!(
            load_price_table(file.path(), thb()),
            Err(Error::History(_))
        ));
    }

    #[test]
    fn foreign_quote_rejected() {
        let file = write("timestamp,USDT_BTC\n2024-01-01 00:00:00,1.0\n");
        assert!(matches!(
            load_price_table(file.path(), thb()),
            Err(Error::History(_))
        ));
    }

    #[test]
    fn missing_file_is_csv_error() {
        let err = load_price_table(Path::new("/nonexistent/prices.csv"), thb()).unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn validate_targets_requires_columns() {
        let file = write("timestamp,THB_XRP\n2024-01-01 00:00:00,18.0\n");
        let table = load_price_table(file.path(), thb()).unwrap();

        let ok = TargetAllocation::new(thb(), vec![(thb(), 0.5), (Symbol::new("XRP"), 0.5)]).unwrap();
        assert!(table.validate_targets(&ok).is_ok());

        let missing =
            TargetAllocation::new(thb(), vec![(thb(), 0.5), (Symbol::new("BTC"), 0.5)]).unwrap();
        assert!(matches!(
            table.validate_targets(&missing),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn merge_outer_joins_and_fills() {
        let xrp = Symbol::new("XRP");
        let sand = Symbol::new("SAND");
        let table = merge_series(
            thb(),
            vec![
                (
                    xrp,
                    vec![
                        (ts("2024-01-01 00:00:00"), 18.0),
                        (ts("2024-01-03 00:00:00"), 19.0),
                    ],
                ),
                (sand, vec![(ts("2024-01-02 00:00:00"), 15.0)]),
            ],
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.column(xrp).unwrap(), &[Some(18.0), Some(18.0), Some(19.0)]);
        assert_eq!(table.column(sand).unwrap(), &[Some(15.0), Some(15.0), Some(15.0)]);
    }

    #[test]
    fn write_then_load_preserves_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prices.csv");
        let table = merge_series(
            thb(),
            vec![(
                Symbol::new("BTC"),
                vec![
                    (ts("2024-01-01 00:00:00"), 1_500_000.5),
                    (ts("2024-01-02 00:00:00"), 1_510_000.0),
                ],
            )],
        )
        .unwrap();
        table.write_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("timestamp,THB_BTC\n2024-01-01 00:00:00,1500000.5\n"));
        assert_eq!(load_price_table(&path, thb()).unwrap(), table);
    }
}
