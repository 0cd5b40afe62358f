//! Record parsing
//!
//! Turns [`RawBatch`]es into [`NotificationRecord`]s for one job. Rows that
//! fail a required field are dropped and counted, never fatal. The caller
//! reports the counts to the ledger and writes the dropped rows to the
//! residue file.

pub mod coerce;

use std::collections::BTreeMap;

use crate::core::columns::{ColumnMapping, Field};
use crate::core::source::{RawBatch, RawValue};
use crate::domain::{Disease, Epiweek, NotificationRecord, Uf, UploadJob};
use coerce::{Coerced, Rejected};

/// Per-job values used to fill defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobContext {
    pub disease: Disease,
    pub year: i32,
    pub uf: Option<Uf>,
}

impl From<&UploadJob> for JobContext {
    fn from(job: &UploadJob) -> Self {
        Self {
            disease: job.disease,
            year: job.year,
            uf: job.uf,
        }
    }
}

/// Why a row was excluded
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    /// One-based data row number in the source file
    pub row: u64,
    pub field: Field,
    pub reason: String,
    pub values: Vec<RawValue>,
}

/// Drop counts for one batch, by the first failing field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropReport {
    by_field: BTreeMap<Field, usize>,
}

impl DropReport {
    pub fn record(&mut self, field: Field) {
        *self.by_field.entry(field).or_default() += 1;
    }

    pub fn total(&self) -> usize {
        self.by_field.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    pub fn count(&self, field: Field) -> usize {
        self.by_field.get(&field).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &DropReport) {
        for (field, n) in &other.by_field {
            *self.by_field.entry(*field).or_default() += n;
        }
    }

    /// Ledger warning for batch `chunk`, `None` when nothing was dropped
    pub fn warning(&self, chunk: usize) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let detail: Vec<String> = self
            .by_field
            .iter()
            .map(|(field, n)| format!("{}: {n}", field.canonical()))
            .collect();
        Some(format!(
            "Chunk {}: dropped {} row(s) failing required fields ({})",
            chunk + 1,
            self.total(),
            detail.join(", ")
        ))
    }
}

/// Output of parsing one batch
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBatch {
    pub index: usize,
    pub rows_read: usize,
    pub records: Vec<NotificationRecord>,
    pub drops: DropReport,
    pub dropped: Vec<DroppedRow>,
    /// Rows whose geocode lies outside the job's federative unit
    pub uf_mismatches: usize,
}

impl ParsedBatch {
    pub fn uf_warning(&self, uf: Option<Uf>) -> Option<String> {
        match uf {
            Some(uf) if self.uf_mismatches > 0 => Some(format!(
                "Chunk {}: {} row(s) have a municipality outside {uf}",
                self.index + 1,
                self.uf_mismatches
            )),
            _ => None,
        }
    }
}

struct RowDrop {
    field: Field,
    reason: String,
}

impl RowDrop {
    fn missing(field: Field) -> Self {
        Self {
            field,
            reason: format!("{} is missing", field.canonical()),
        }
    }

    fn invalid(field: Field, rejected: Rejected) -> Self {
        Self {
            field,
            reason: format!("{} has invalid value {rejected}", field.canonical()),
        }
    }
}

/// Parser bound to one job's column mapping and defaults
#[derive(Debug, Clone)]
pub struct RecordParser {
    mapping: ColumnMapping,
    context: JobContext,
}

impl RecordParser {
    pub fn new(mapping: ColumnMapping, context: JobContext) -> Self {
        Self { mapping, context }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }

    pub fn parse_batch(&self, batch: RawBatch) -> ParsedBatch {
        let rows_read = batch.rows.len();
        let mut records = Vec::with_capacity(rows_read);
        let mut drops = DropReport::default();
        let mut dropped = Vec::new();
        let mut uf_mismatches = 0;
        let uf_code = self.context.uf.map(|uf| uf.ibge_code());

        for (offset, row) in batch.rows.into_iter().enumerate() {
            match self.parse_row(&row) {
                Ok(record) => {
                    if let Some(code) = uf_code {
                        if (record.municipio_geocodigo / 100_000) as u8 != code {
                            uf_mismatches += 1;
                        }
                    }
                    records.push(record);
                }
                Err(drop) => {
                    drops.record(drop.field);
                    dropped.push(DroppedRow {
                        row: batch.first_row + offset as u64 + 1,
                        field: drop.field,
                        reason: drop.reason,
                        values: row,
                    });
                }
            }
        }

        ParsedBatch {
            index: batch.index,
            rows_read,
            records,
            drops,
            dropped,
            uf_mismatches,
        }
    }

    fn cell<'a>(&self, row: &'a [RawValue], field: Field) -> &'a RawValue {
        const NULL: &RawValue = &RawValue::Null;
        self.mapping
            .index_of(field)
            .and_then(|i| row.get(i))
            .unwrap_or(NULL)
    }

    /// Required field: a present but unreadable value drops the row
    fn required<T>(
        &self,
        row: &[RawValue],
        field: Field,
        coerce: fn(&RawValue) -> Coerced<T>,
    ) -> Result<Option<T>, RowDrop> {
        coerce(self.cell(row, field)).map_err(|rejected| RowDrop::invalid(field, rejected))
    }

    /// Optional field: unreadable values become null
    fn optional<T>(&self, row: &[RawValue], field: Field, coerce: fn(&RawValue) -> Coerced<T>) -> Option<T> {
        coerce(self.cell(row, field)).ok().flatten()
    }

    fn parse_row(&self, row: &[RawValue]) -> Result<NotificationRecord, RowDrop> {
        let ctx = &self.context;

        let nu_notific = self
            .required(row, Field::NuNotific, coerce::notification_number)?
            .ok_or_else(|| RowDrop::missing(Field::NuNotific))?;
        let dt_notific = self
            .required(row, Field::DtNotific, coerce::date)?
            .ok_or_else(|| RowDrop::missing(Field::DtNotific))?;
        let cid10_codigo = coerce::text(self.cell(row, Field::IdAgravo))
            .unwrap_or_else(|| ctx.disease.cid10().to_string());
        let municipio_geocodigo = self
            .required(row, Field::IdMunicip, coerce::geocode)?
            .ok_or_else(|| RowDrop::missing(Field::IdMunicip))?
            .value();

        let se_notif = self
            .required(row, Field::SemNot, coerce::epiweek)?
            .or_else(|| Epiweek::from_date(dt_notific).map(|ew| ew.week as i32));
        let ano_notif = self.required(row, Field::NuAno, coerce::int32)?.unwrap_or(ctx.year);
        let dt_sin_pri = self.required(row, Field::DtSinPri, coerce::date)?;
        let se_sin_pri = self
            .required(row, Field::SemPri, coerce::epiweek)?
            .or_else(|| dt_sin_pri.and_then(Epiweek::from_date).map(|ew| ew.week as i32));

        Ok(NotificationRecord {
            nu_notific,
            dt_notific,
            cid10_codigo,
            municipio_geocodigo,
            se_notif,
            ano_notif,
            dt_sin_pri,
            se_sin_pri,
            dt_digita: self.required(row, Field::DtDigita, coerce::date)?,
            dt_nasc: self.required(row, Field::DtNasc, coerce::date)?,
            cs_sexo: coerce::sex(self.cell(row, Field::CsSexo)),
            nu_idade_n: self.required(row, Field::NuIdadeN, coerce::int32)?,
            resul_pcr: self.optional(row, Field::ResulPcr, coerce::int32).unwrap_or(0),
            criterio: self.optional(row, Field::Criterio, coerce::int32).unwrap_or(0),
            classi_fin: self.optional(row, Field::ClassiFin, coerce::int32).unwrap_or(0),
            dt_chik_s1: self.optional(row, Field::DtChikS1, coerce::date),
            dt_chik_s2: self.optional(row, Field::DtChikS2, coerce::date),
            dt_prnt: self.optional(row, Field::DtPrnt, coerce::date),
            res_chiks1: self.optional(row, Field::ResChikS1, coerce::int32),
            res_chiks2: self.optional(row, Field::ResChikS2, coerce::int32),
            resul_prnt: self.optional(row, Field::ResulPrnt, coerce::int32),
            dt_soro: self.optional(row, Field::DtSoro, coerce::date),
            resul_soro: self.optional(row, Field::ResulSoro, coerce::int32),
            dt_ns1: self.optional(row, Field::DtNs1, coerce::date),
            resul_ns1: self.optional(row, Field::ResulNs1, coerce::int32),
            dt_viral: self.optional(row, Field::DtViral, coerce::date),
            resul_vi_n: self.optional(row, Field::ResulViN, coerce::int32),
            dt_pcr: self.optional(row, Field::DtPcr, coerce::date),
            sorotipo: self
                .optional(row, Field::Sorotipo, coerce::int32)
                .or(ctx.disease.default_serotype()),
            id_distrit: self.optional(row, Field::IdDistrit, coerce::int32),
            id_bairro: self.optional(row, Field::IdBairro, coerce::int32),
            nm_bairro: coerce::text(self.cell(row, Field::NmBairro)),
            id_unidade: self.optional(row, Field::IdUnidade, coerce::int32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADERS: [&str; 12] = [
        "NU_NOTIFIC", "DT_NOTIFIC", "ID_AGRAVO", "ID_MUNICIP", "SEM_NOT", "NU_ANO", "DT_SIN_PRI",
        "SEM_PRI", "DT_DIGITA", "DT_NASC", "CS_SEXO", "NU_IDADE_N",
    ];

    fn parser(extra: &[&str], context: JobContext) -> RecordParser {
        let headers: Vec<String> = HEADERS.iter().chain(extra).map(|s| s.to_string()).collect();
        RecordParser::new(ColumnMapping::reconcile(&headers).unwrap(), context)
    }

    fn dengue() -> JobContext {
        JobContext {
            disease: Disease::Dengue,
            year: 2024,
            uf: None,
        }
    }

    fn row(values: &[&str]) -> Vec<RawValue> {
        values.iter().map(|v| RawValue::text(v)).collect()
    }

    fn valid() -> Vec<&'static str> {
        vec![
            "1234567", "2024-01-05", "A90", "3304557", "202401", "2024", "2024-01-02", "202401",
            "2024-01-06", "1990-05-01", "F", "4034",
        ]
    }

    fn batch(rows: Vec<Vec<RawValue>>) -> RawBatch {
        RawBatch {
            index: 0,
            first_row: 0,
            rows,
        }
    }

    #[test]
    fn test_valid_row() {
        let parsed = parser(&[], dengue()).parse_batch(batch(vec![row(&valid())]));
        assert!(parsed.drops.is_empty());
        let r = &parsed.records[0];
        assert_eq!(r.nu_notific, 1234567);
        assert_eq!(r.dt_notific, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(r.se_notif, Some(1));
        assert_eq!(r.cs_sexo, "F");
        assert_eq!(r.resul_pcr, 0);
        assert_eq!(r.sorotipo, None);
    }

    #[test]
    fn test_unparseable_date_drops_row() {
        let mut bad = valid();
        bad[1] = "2024-02-30";
        let parsed = parser(&[], dengue()).parse_batch(batch(vec![row(&valid()), row(&bad)]));

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.drops.total(), 1);
        assert_eq!(parsed.drops.count(Field::DtNotific), 1);
        assert_eq!(parsed.dropped[0].row, 2);
        assert!(parsed.dropped[0].reason.contains("DT_NOTIFIC"));
        let warning = parsed.drops.warning(parsed.index).unwrap();
        assert!(warning.contains("dropped 1 row(s)"));
        assert!(warning.contains("DT_NOTIFIC: 1"));
    }

    #[test]
    fn test_defaults_from_job() {
        let mut values = valid();
        values[2] = "";
        values[4] = "";
        values[5] = "";
        values[7] = "";
        let context = JobContext {
            disease: Disease::Chikungunya,
            year: 2023,
            uf: None,
        };
        let parsed = parser(&[], context).parse_batch(batch(vec![row(&values)]));
        let r = &parsed.records[0];
        assert_eq!(r.cid10_codigo, "A92.0");
        assert_eq!(r.ano_notif, 2023);
        assert_eq!(r.se_notif, Some(1));
        assert_eq!(r.se_sin_pri, Some(1));
        assert_eq!(r.sorotipo, Some(0));
    }

    #[test]
    fn test_missing_key_drops_but_null_required_does_not() {
        let mut no_key = valid();
        no_key[0] = "";
        let mut null_birth = valid();
        null_birth[9] = "";
        let parsed =
            parser(&[], dengue()).parse_batch(batch(vec![row(&no_key), row(&null_birth)]));
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].dt_nasc, None);
        assert_eq!(parsed.drops.count(Field::NuNotific), 1);
    }

    #[test]
    fn test_optional_invalid_becomes_default() {
        let mut values = valid();
        values.extend(["X", "2", "bad-date", "3"]);
        let parsed = parser(&["RESUL_PCR_", "SOROTIPO", "DT_PCR", "CLASSI_FIN"], dengue())
            .parse_batch(batch(vec![row(&values)]));
        let r = &parsed.records[0];
        assert_eq!(r.resul_pcr, 0);
        assert_eq!(r.sorotipo, Some(2));
        assert_eq!(r.dt_pcr, None);
        assert_eq!(r.classi_fin, 3);
    }

    #[test]
    fn test_six_digit_geocode_and_legacy_number() {
        let mut values = valid();
        values[0] = "1,234,567";
        values[3] = "330455";
        let parsed = parser(&[], dengue()).parse_batch(batch(vec![row(&values)]));
        assert_eq!(parsed.records[0].nu_notific, 1234567);
        assert_eq!(parsed.records[0].municipio_geocodigo, 3304557);
    }

    #[test]
    fn test_uf_mismatch_counted() {
        let context = JobContext {
            uf: Some(Uf::SP),
            ..dengue()
        };
        let parsed = parser(&[], context).parse_batch(batch(vec![row(&valid())]));
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.uf_mismatches, 1);
        assert!(parsed.uf_warning(Some(Uf::SP)).unwrap().contains("outside SP"));
    }

    #[test]
    fn test_drop_report_merge() {
        let mut a = DropReport::default();
        a.record(Field::DtNotific);
        let mut b = DropReport::default();
        b.record(Field::DtNotific);
        b.record(Field::NuIdadeN);
        a.merge(&b);
        assert_eq!(a.total(), 3);
        assert_eq!(a.count(Field::DtNotific), 2);
    }
}
