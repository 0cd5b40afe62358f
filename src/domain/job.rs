//! Upload job domain model
//!
//! An [`UploadJob`] identifies one ingestion run: which file, which disease,
//! which jurisdiction and year, and who submitted it. It is immutable once
//! accepted; everything the pipeline learns about the run goes to the ledger.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::epiweek::Epiweek;
use super::ids::JobId;

/// Oldest notification year accepted
pub const MIN_YEAR: i32 = 1970;

/// Notifiable diseases handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Dengue,
    Chikungunya,
    Zika,
}

impl Disease {
    /// CID-10 code stored in `cid10_codigo`
    pub fn cid10(&self) -> &'static str {
        match self {
            Disease::Dengue => "A90",
            Disease::Chikungunya => "A92.0",
            Disease::Zika => "A928",
        }
    }

    /// Serotype used when the file leaves SOROTIPO empty
    pub fn default_serotype(&self) -> Option<i32> {
        match self {
            Disease::Dengue => None,
            Disease::Chikungunya | Disease::Zika => Some(0),
        }
    }

    /// Short tag used in archived file names
    pub fn tag(&self) -> &'static str {
        match self {
            Disease::Dengue => "DENG",
            Disease::Chikungunya => "CHIK",
            Disease::Zika => "ZIKA",
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Disease::Dengue => "Dengue",
            Disease::Chikungunya => "Chikungunya",
            Disease::Zika => "Zika",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Disease {
    type Err = String;

    /// Accepts the disease name, its archive tag or its CID-10 code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DENGUE" | "DENG" | "A90" => Ok(Disease::Dengue),
            "CHIKUNGUNYA" | "CHIK" | "A92.0" | "A920" => Ok(Disease::Chikungunya),
            "ZIKA" | "A928" | "A92.8" => Ok(Disease::Zika),
            other => Err(format!("Unknown disease '{other}'")),
        }
    }
}

/// Brazilian federative units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Uf {
    AC, AL, AP, AM, BA, CE, DF, ES, GO, MA, MT, MS, MG, PA,
    PB, PR, PE, PI, RJ, RN, RS, RO, RR, SC, SP, SE, TO,
}

impl Uf {
    pub const ALL: [Uf; 27] = [
        Uf::AC, Uf::AL, Uf::AP, Uf::AM, Uf::BA, Uf::CE, Uf::DF, Uf::ES, Uf::GO,
        Uf::MA, Uf::MT, Uf::MS, Uf::MG, Uf::PA, Uf::PB, Uf::PR, Uf::PE, Uf::PI,
        Uf::RJ, Uf::RN, Uf::RS, Uf::RO, Uf::RR, Uf::SC, Uf::SP, Uf::SE, Uf::TO,
    ];

    /// IBGE code, which is also the first two digits of every municipality geocode
    pub fn ibge_code(&self) -> u8 {
        match self {
            Uf::AC => 12, Uf::AL => 27, Uf::AP => 16, Uf::AM => 13, Uf::BA => 29,
            Uf::CE => 23, Uf::DF => 53, Uf::ES => 32, Uf::GO => 52, Uf::MA => 21,
            Uf::MT => 51, Uf::MS => 50, Uf::MG => 31, Uf::PA => 15, Uf::PB => 25,
            Uf::PR => 41, Uf::PE => 26, Uf::PI => 22, Uf::RJ => 33, Uf::RN => 24,
            Uf::RS => 43, Uf::RO => 11, Uf::RR => 14, Uf::SC => 42, Uf::SP => 35,
            Uf::SE => 28, Uf::TO => 17,
        }
    }
}

impl fmt::Display for Uf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for Uf {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Uf::ALL
            .iter()
            .copied()
            .find(|uf| uf.to_string() == wanted)
            .ok_or_else(|| format!("Unknown federative unit '{s}'"))
    }
}

/// One accepted ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadJob {
    pub id: JobId,
    pub disease: Disease,
    /// `None` means a nationwide file
    pub uf: Option<Uf>,
    pub year: i32,
    pub source: PathBuf,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

impl UploadJob {
    /// File name of the source, used in ledger messages
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    /// Archived name: `<epiweek>_<DISEASE>_<UF|BR>-<stem>.<ext>`
    pub fn archive_file_name(&self) -> String {
        let created = self.created_at.date_naive();
        let epiweek = Epiweek::from_date(created)
            .map_or_else(|| format!("{}00", created.year()), |ew| ew.to_string());
        let scope = self.uf.map(|uf| uf.to_string()).unwrap_or_else(|| "BR".to_string());
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = format!("{epiweek}_{}_{scope}-{stem}", self.disease.tag());
        match self.source.extension() {
            Some(ext) => format!("{base}.{}", ext.to_string_lossy().to_lowercase()),
            None => base,
        }
    }

    /// Copy of this job pointing at a relocated source file
    pub fn with_source(&self, source: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            ..self.clone()
        }
    }
}

/// Builder for [`UploadJob`]
#[derive(Debug, Default)]
pub struct UploadJobBuilder {
    id: Option<JobId>,
    disease: Option<Disease>,
    uf: Option<Uf>,
    year: Option<i32>,
    source: Option<PathBuf>,
    owner: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl UploadJobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: JobId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn disease(mut self, disease: Disease) -> Self {
        self.disease = Some(disease);
        self
    }

    pub fn uf(mut self, uf: Option<Uf>) -> Self {
        self.uf = uf;
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Validates and builds the job
    ///
    /// Returns an error if the disease, year or source is missing, or the year
    /// is outside `1970..=current year`.
    pub fn build(self) -> Result<UploadJob, String> {
        let disease = self.disease.ok_or("disease is required")?;
        let year = self.year.ok_or("year is required")?;
        let source = self.source.ok_or("source file is required")?;
        let created_at = self.created_at.unwrap_or_else(Utc::now);

        let current_year = Utc::now().year();
        if !(MIN_YEAR..=current_year).contains(&year) {
            return Err(format!(
                "year {year} is outside the accepted range {MIN_YEAR}..={current_year}"
            ));
        }

        Ok(UploadJob {
            id: self.id.unwrap_or_default(),
            disease,
            uf: self.uf,
            year,
            source,
            owner: self.owner.unwrap_or_else(|| "anonymous".to_string()),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_job() -> UploadJob {
        UploadJobBuilder::new()
            .disease(Disease::Chikungunya)
            .uf(Some(Uf::RJ))
            .year(2024)
            .source("/uploads/BR_CHIK_2024.DBF")
            .owner("analyst")
            .created_at(Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_disease_codes_and_serotypes() {
        assert_eq!(Disease::Dengue.cid10(), "A90");
        assert_eq!(Disease::Dengue.default_serotype(), None);
        assert_eq!(Disease::Zika.default_serotype(), Some(0));
        assert_eq!("a92.0".parse::<Disease>().unwrap(), Disease::Chikungunya);
        assert!("malaria".parse::<Disease>().is_err());
    }

    #[test]
    fn test_uf_parse_and_code() {
        assert_eq!("sp".parse::<Uf>().unwrap(), Uf::SP);
        assert_eq!(Uf::SP.ibge_code(), 35);
        assert_eq!(Uf::RJ.ibge_code(), 33);
        assert!("XX".parse::<Uf>().is_err());
    }

    #[test]
    fn test_builder_requires_fields() {
        assert!(UploadJobBuilder::new().year(2024).source("a.csv").build().is_err());
        assert!(UploadJobBuilder::new()
            .disease(Disease::Dengue)
            .source("a.csv")
            .build()
            .is_err());
    }

    #[test]
    fn test_builder_rejects_out_of_range_year() {
        let result = UploadJobBuilder::new()
            .disease(Disease::Dengue)
            .year(1969)
            .source("a.csv")
            .build();
        assert!(result.unwrap_err().contains("1969"));
    }

    #[test]
    fn test_archive_file_name() {
        let job = sample_job();
        assert_eq!(job.archive_file_name(), "202411_CHIK_RJ-BR_CHIK_2024.dbf");
        assert_eq!(job.file_name(), "BR_CHIK_2024.DBF");
    }

    #[test]
    fn test_archive_file_name_nationwide() {
        let job = UploadJob { uf: None, ..sample_job() };
        assert!(job.archive_file_name().contains("_CHIK_BR-"));
    }
}
