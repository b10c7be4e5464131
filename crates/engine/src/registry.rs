//! Per-silo configuration registry.
//!
//! Holds capacity, operational status, and alerting thresholds for every
//! known silo. Readers receive owned snapshots — an evaluation that is
//! already in flight never observes a concurrent configuration change, and
//! threshold updates apply to subsequent readings only.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use granary_core::error::CoreError;
use granary_core::thresholds::SiloThresholds;
use granary_core::types::SiloId;

/// Operational status of a silo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiloStatus {
    Active,
    Inactive,
    Maintenance,
}

/// Configuration for a single silo.
#[derive(Debug, Clone, Serialize)]
pub struct SiloConfig {
    pub silo_id: SiloId,
    pub name: String,
    /// Total storage capacity in tons. Zero for silos that were only ever
    /// configured via `set_thresholds` — those are excluded from capacity
    /// utilization.
    pub capacity_tons: f64,
    pub status: SiloStatus,
    pub thresholds: SiloThresholds,
}

/// Cross-silo totals used by the KPI snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegistryOverview {
    pub total: usize,
    pub active: usize,
    pub total_capacity_tons: f64,
}

/// Thread-safe registry of silo configurations.
#[derive(Default)]
pub struct SiloRegistry {
    inner: RwLock<HashMap<SiloId, SiloConfig>>,
}

impl SiloRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a silo's configuration.
    pub fn register(&self, config: SiloConfig) -> Result<(), CoreError> {
        if config.name.is_empty() {
            return Err(CoreError::Validation(
                "Silo name must not be empty".to_string(),
            ));
        }
        if !config.capacity_tons.is_finite() || config.capacity_tons < 0.0 {
            return Err(CoreError::Validation(
                "capacity_tons must be finite and non-negative".to_string(),
            ));
        }
        config.thresholds.validate()?;

        let mut inner = self.write();
        inner.insert(config.silo_id, config);
        Ok(())
    }

    /// Update the alerting thresholds for a silo.
    ///
    /// A silo that was never registered gets a minimal placeholder
    /// configuration, so threshold-only deployments work without a
    /// separate registration step.
    pub fn set_thresholds(
        &self,
        silo_id: SiloId,
        thresholds: SiloThresholds,
    ) -> Result<(), CoreError> {
        thresholds.validate()?;

        let mut inner = self.write();
        inner
            .entry(silo_id)
            .and_modify(|config| config.thresholds = thresholds)
            .or_insert_with(|| SiloConfig {
                silo_id,
                name: format!("silo-{silo_id}"),
                capacity_tons: 0.0,
                status: SiloStatus::Active,
                thresholds,
            });
        Ok(())
    }

    /// Owned snapshot of one silo's configuration.
    pub fn get(&self, silo_id: SiloId) -> Option<SiloConfig> {
        self.read().get(&silo_id).cloned()
    }

    /// Owned snapshots of every configuration, unordered.
    pub fn list(&self) -> Vec<SiloConfig> {
        self.read().values().cloned().collect()
    }

    /// Cross-silo totals for the KPI snapshot.
    pub fn overview(&self) -> RegistryOverview {
        let inner = self.read();
        RegistryOverview {
            total: inner.len(),
            active: inner
                .values()
                .filter(|c| c.status == SiloStatus::Active)
                .count(),
            total_capacity_tons: inner.values().map(|c| c.capacity_tons).sum(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<SiloId, SiloConfig>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<SiloId, SiloConfig>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
