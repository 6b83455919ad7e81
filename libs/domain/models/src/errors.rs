// [libs/domain/models/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN SCHEMA ERROR CATALOG (V3.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE VIOLACIONES DE ESQUEMA
 * =================================================================
 */

use thiserror::Error;

/// Violación estructural de un bead o de la configuración tipada.
/// Errores de programador: deben aflorar fatalmente, nunca silenciarse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// La clase temporal exige (u prohíbe) una ventana de tiempo de mundo.
    #[error("[L2_SCHEMA_FAULT]: TEMPORAL_CLASS_VIOLATION -> field '{field}': {reason}")]
    TemporalClass { field: String, reason: String },

    /// Los tipos derivados requieren linaje no vacío.
    #[error("[L2_SCHEMA_FAULT]: LINEAGE_REQUIRED -> bead_type '{bead_type}' demands non-empty lineage")]
    LineageRequired { bead_type: String },

    /// Ventana temporal incoherente (from > to, o conocimiento anterior al mundo).
    #[error("[L2_SCHEMA_FAULT]: TEMPORAL_ORDER_VIOLATION -> {reason}")]
    TemporalOrder { reason: String },

    /// PROPOSAL_REJECTED con categoría RISK_BREACH exige referencia de política.
    #[error("[L2_SCHEMA_FAULT]: POLICY_REF_REQUIRED -> RISK_BREACH rejection without rejection_policy_ref")]
    PolicyRefRequired,

    /// El contenido no corresponde al tipo de bead declarado.
    #[error("[L2_SCHEMA_FAULT]: CONTENT_TYPE_MISMATCH -> header '{header}' vs payload '{payload}'")]
    ContentTypeMismatch { header: String, payload: String },

    /// Fallo de deserialización de un bead almacenado.
    #[error("[L2_SCHEMA_FAULT]: MALFORMED_FIELD -> field '{field}': {reason}")]
    Malformed { field: String, reason: String },

    /// Fallo de carga de configuración tipada.
    #[error("[L2_CONFIG_FAULT]: CONFIG_REJECTED -> {0}")]
    Config(String),
}
