//! Reference entities used to decorate consumption and projection rows

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::keys::{deserialize_key, deserialize_opt_key};

/// Label used when a person reference cannot be resolved
pub const UNIDENTIFIED_LABEL: &str = "Sin identificar";

/// Label used for any other unresolved reference
pub const NOT_AVAILABLE_LABEL: &str = "N/A";

/// A secondary entity looked up by its natural key
pub trait ReferenceEntity {
    /// Value of the column the entity is looked up by
    fn natural_key(&self) -> String;

    /// Text shown in place of the key
    fn display_label(&self) -> String;
}

/// Staff member (`personal`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personal {
    #[serde(deserialize_with = "deserialize_key")]
    pub identificacion: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: Option<String>,
    #[serde(default)]
    pub cargo: Option<String>,
}

impl ReferenceEntity for Personal {
    fn natural_key(&self) -> String {
        self.identificacion.clone()
    }

    fn display_label(&self) -> String {
        match self.apellido.as_deref().map(str::trim) {
            Some(apellido) if !apellido.is_empty() => {
                format!("{} {}", self.nombre.trim(), apellido)
            }
            _ => self.nombre.trim().to_string(),
        }
    }
}

/// Installation / site (`instalaciones`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instalacion {
    pub id: i64,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl ReferenceEntity for Instalacion {
    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn display_label(&self) -> String {
        match self.alias.as_deref() {
            Some(alias) if !alias.trim().is_empty() => {
                format!("{} ({})", self.nombre, alias.trim())
            }
            _ => self.nombre.clone(),
        }
    }
}

/// Warehouse article (`articulos`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Articulo {
    #[serde(deserialize_with = "deserialize_key")]
    pub codigo: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub unidad: Option<String>,
    #[serde(default)]
    pub categoria_gasto_id: Option<i64>,
    #[serde(default)]
    pub costo_unitario: Option<Decimal>,
}

impl ReferenceEntity for Articulo {
    fn natural_key(&self) -> String {
        self.codigo.clone()
    }

    fn display_label(&self) -> String {
        self.nombre.clone()
    }
}

/// Expense category (`categorias_gasto`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriaGasto {
    pub id: i64,
    #[serde(default)]
    pub nombre: String,
}

impl ReferenceEntity for CategoriaGasto {
    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn display_label(&self) -> String {
        self.nombre.clone()
    }
}

/// Issuance document header (`salidas`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalidaHeader {
    pub numero_solicitud: i64,
    #[serde(default)]
    pub fecha: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_opt_key")]
    pub identificacion: Option<String>,
    #[serde(default)]
    pub instalacion_id: Option<i64>,
    #[serde(default)]
    pub observaciones: Option<String>,
}

impl ReferenceEntity for SalidaHeader {
    fn natural_key(&self) -> String {
        self.numero_solicitud.to_string()
    }

    fn display_label(&self) -> String {
        format!("#{}", self.numero_solicitud)
    }
}
