//! Typed notification rows
//!
//! [`NotificationRecord`] is the shape of one row of the destination table,
//! minus the surrogate `id` the database assigns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Natural key of a notification: unique in the destination table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniqueKey {
    pub nu_notific: i64,
    pub dt_notific: NaiveDate,
    pub cid10_codigo: String,
    pub municipio_geocodigo: i32,
}

/// One parsed case notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub nu_notific: i64,
    pub dt_notific: NaiveDate,
    pub cid10_codigo: String,
    pub municipio_geocodigo: i32,
    pub se_notif: Option<i32>,
    pub ano_notif: i32,
    pub dt_sin_pri: Option<NaiveDate>,
    pub se_sin_pri: Option<i32>,
    pub dt_digita: Option<NaiveDate>,
    pub dt_nasc: Option<NaiveDate>,
    pub cs_sexo: String,
    pub nu_idade_n: Option<i32>,
    pub resul_pcr: i32,
    pub criterio: i32,
    pub classi_fin: i32,
    pub dt_chik_s1: Option<NaiveDate>,
    pub dt_chik_s2: Option<NaiveDate>,
    pub dt_prnt: Option<NaiveDate>,
    pub res_chiks1: Option<i32>,
    pub res_chiks2: Option<i32>,
    pub resul_prnt: Option<i32>,
    pub dt_soro: Option<NaiveDate>,
    pub resul_soro: Option<i32>,
    pub dt_ns1: Option<NaiveDate>,
    pub resul_ns1: Option<i32>,
    pub dt_viral: Option<NaiveDate>,
    pub resul_vi_n: Option<i32>,
    pub dt_pcr: Option<NaiveDate>,
    pub sorotipo: Option<i32>,
    pub id_distrit: Option<i32>,
    pub id_bairro: Option<i32>,
    pub nm_bairro: Option<String>,
    pub id_unidade: Option<i32>,
}

impl NotificationRecord {
    pub fn key(&self) -> UniqueKey {
        UniqueKey {
            nu_notific: self.nu_notific,
            dt_notific: self.dt_notific,
            cid10_codigo: self.cid10_codigo.clone(),
            municipio_geocodigo: self.municipio_geocodigo,
        }
    }
}

#[cfg(test)]
impl NotificationRecord {
    /// Minimal valid dengue record for tests
    pub(crate) fn sample(nu_notific: i64) -> Self {
        Self {
            nu_notific,
            dt_notific: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            cid10_codigo: "A90".to_string(),
            municipio_geocodigo: 3304557,
            se_notif: Some(1),
            ano_notif: 2024,
            dt_sin_pri: None,
            se_sin_pri: None,
            dt_digita: None,
            dt_nasc: None,
            cs_sexo: "I".to_string(),
            nu_idade_n: None,
            resul_pcr: 0,
            criterio: 0,
            classi_fin: 0,
            dt_chik_s1: None,
            dt_chik_s2: None,
            dt_prnt: None,
            res_chiks1: None,
            res_chiks2: None,
            resul_prnt: None,
            dt_soro: None,
            resul_soro: None,
            dt_ns1: None,
            resul_ns1: None,
            dt_viral: None,
            resul_vi_n: None,
            dt_pcr: None,
            sorotipo: None,
            id_distrit: None,
            id_bairro: None,
            nm_bairro: None,
            id_unidade: None,
        }
    }
}
