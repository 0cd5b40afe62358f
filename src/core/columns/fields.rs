//! Catalogue of SINAN fields known to the pipeline

/// How raw values of a field are coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Calendar date
    Date,
    /// Integer code or count
    Integer,
    /// Free text
    Text,
    /// Notification number, tolerant of legacy separators
    NotificationNumber,
    /// IBGE municipality geocode
    Geocode,
    /// CID-10 disease code
    DiseaseCode,
    /// Epidemiological week, last two digits kept
    Epiweek,
    /// Notification year
    Year,
    /// Sex code: M, F or I
    Sex,
}

/// Canonical SINAN fields, in destination column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    DtNotific,
    SemNot,
    NuAno,
    DtSinPri,
    SemPri,
    DtDigita,
    IdMunicip,
    NuNotific,
    IdAgravo,
    DtNasc,
    CsSexo,
    NuIdadeN,
    ResulPcr,
    Criterio,
    ClassiFin,
    DtChikS1,
    DtChikS2,
    DtPrnt,
    ResChikS1,
    ResChikS2,
    ResulPrnt,
    DtSoro,
    ResulSoro,
    DtNs1,
    ResulNs1,
    DtViral,
    ResulViN,
    DtPcr,
    Sorotipo,
    IdDistrit,
    IdBairro,
    NmBairro,
    IdUnidade,
}

/// Static description of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    /// Header name in SINAN exports
    pub canonical: &'static str,
    /// Destination table column
    pub column: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn spec(
    field: Field,
    canonical: &'static str,
    column: &'static str,
    kind: FieldKind,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        field,
        canonical,
        column,
        kind,
        required,
    }
}

use FieldKind::*;

pub const FIELD_COUNT: usize = 33;

/// Every field, indexed by `Field as usize`
pub static FIELDS: [FieldSpec; FIELD_COUNT] = [
    spec(Field::DtNotific, "DT_NOTIFIC", "dt_notific", Date, true),
    spec(Field::SemNot, "SEM_NOT", "se_notif", Epiweek, true),
    spec(Field::NuAno, "NU_ANO", "ano_notif", Year, true),
    spec(Field::DtSinPri, "DT_SIN_PRI", "dt_sin_pri", Date, true),
    spec(Field::SemPri, "SEM_PRI", "se_sin_pri", Epiweek, true),
    spec(Field::DtDigita, "DT_DIGITA", "dt_digita", Date, true),
    spec(Field::IdMunicip, "ID_MUNICIP", "municipio_geocodigo", Geocode, true),
    spec(Field::NuNotific, "NU_NOTIFIC", "nu_notific", NotificationNumber, true),
    spec(Field::IdAgravo, "ID_AGRAVO", "cid10_codigo", DiseaseCode, true),
    spec(Field::DtNasc, "DT_NASC", "dt_nasc", Date, true),
    spec(Field::CsSexo, "CS_SEXO", "cs_sexo", Sex, true),
    spec(Field::NuIdadeN, "NU_IDADE_N", "nu_idade_n", Integer, true),
    spec(Field::ResulPcr, "RESUL_PCR_", "resul_pcr", Integer, false),
    spec(Field::Criterio, "CRITERIO", "criterio", Integer, false),
    spec(Field::ClassiFin, "CLASSI_FIN", "classi_fin", Integer, false),
    spec(Field::DtChikS1, "DT_CHIK_S1", "dt_chik_s1", Date, false),
    spec(Field::DtChikS2, "DT_CHIK_S2", "dt_chik_s2", Date, false),
    spec(Field::DtPrnt, "DT_PRNT", "dt_prnt", Date, false),
    spec(Field::ResChikS1, "RES_CHIKS1", "res_chiks1", Integer, false),
    spec(Field::ResChikS2, "RES_CHIKS2", "res_chiks2", Integer, false),
    spec(Field::ResulPrnt, "RESUL_PRNT", "resul_prnt", Integer, false),
    spec(Field::DtSoro, "DT_SORO", "dt_soro", Date, false),
    spec(Field::ResulSoro, "RESUL_SORO", "resul_soro", Integer, false),
    spec(Field::DtNs1, "DT_NS1", "dt_ns1", Date, false),
    spec(Field::ResulNs1, "RESUL_NS1", "resul_ns1", Integer, false),
    spec(Field::DtViral, "DT_VIRAL", "dt_viral", Date, false),
    spec(Field::ResulViN, "RESUL_VI_N", "resul_vi_n", Integer, false),
    spec(Field::DtPcr, "DT_PCR", "dt_pcr", Date, false),
    spec(Field::Sorotipo, "SOROTIPO", "sorotipo", Integer, false),
    spec(Field::IdDistrit, "ID_DISTRIT", "id_distrit", Integer, false),
    spec(Field::IdBairro, "ID_BAIRRO", "id_bairro", Integer, false),
    spec(Field::NmBairro, "NM_BAIRRO", "nm_bairro", Text, false),
    spec(Field::IdUnidade, "ID_UNIDADE", "id_unidade", Integer, false),
];

/// Historical alternate headers, tried in order when the canonical is absent
pub static SYNONYMS: &[(Field, &[&str])] = &[(Field::IdMunicip, &["ID_MN_RESI"])];

/// Fields forming the uniqueness key; rows missing any are always dropped
pub const KEY_FIELDS: [Field; 4] = [
    Field::NuNotific,
    Field::DtNotific,
    Field::IdAgravo,
    Field::IdMunicip,
];

impl Field {
    pub fn spec(&self) -> &'static FieldSpec {
        &FIELDS[*self as usize]
    }

    pub fn canonical(&self) -> &'static str {
        self.spec().canonical
    }

    pub fn column(&self) -> &'static str {
        self.spec().column
    }

    pub fn is_required(&self) -> bool {
        self.spec().required
    }

    pub fn synonyms(&self) -> &'static [&'static str] {
        SYNONYMS
            .iter()
            .find(|(field, _)| field == self)
            .map(|(_, names)| *names)
            .unwrap_or(&[])
    }
}

/// Destination columns in catalogue order
pub fn destination_columns() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|spec| spec.column)
}
