#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use reclist_contracts::envelope::{CarrierField, CarrierFields, IntegrityEnvelope};
use reclist_contracts::list_options::{
    RecordLabels, RecordListConfig, RecordListMessages, RecordListMode, RecordListNamespace,
    RecordListOptions,
};
use reclist_contracts::record::{FieldBinding, Identified, RecordFactory, RecordId, RecordKey};
use reclist_contracts::submission::{SubmittedData, REMOVE_SIGNAL_FIELD};
use reclist_contracts::ContractViolation;
use reclist_engines::identity_roster::IdentityRoster;
use reclist_engines::integrity_codec::{IntegrityCodec, IntegrityError};
use reclist_engines::record_set::{RecordSet, RecordSetError};
use reclist_engines::removed_ledger::RemovedLedger;
use tracing::{debug, warn};

use crate::view::{RecordEntryView, RecordListView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordListError {
    Configuration(ContractViolation),
    Integrity(IntegrityError),
    NotFound { key: RecordKey },
    UnverifiedIdentity { key: RecordKey },
    KeySpaceExhausted,
    ReadOnly,
}

impl fmt::Display for RecordListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(v) => write!(f, "record list configuration error: {v}"),
            Self::Integrity(err) => write!(f, "removed-record ledger rejected: {err}"),
            Self::NotFound { key } => write!(f, "record key {key} is not in the record set"),
            Self::UnverifiedIdentity { key } => {
                write!(f, "record identity at key {key} was not issued by this form")
            }
            Self::KeySpaceExhausted => write!(f, "record key space exhausted"),
            Self::ReadOnly => write!(f, "record list is read-only"),
        }
    }
}

impl std::error::Error for RecordListError {}

impl From<ContractViolation> for RecordListError {
    fn from(value: ContractViolation) -> Self {
        Self::Configuration(value)
    }
}

impl From<IntegrityError> for RecordListError {
    fn from(value: IntegrityError) -> Self {
        Self::Integrity(value)
    }
}

impl From<RecordSetError> for RecordListError {
    fn from(value: RecordSetError) -> Self {
        match value {
            RecordSetError::NotFound { key } => Self::NotFound { key },
            RecordSetError::KeySpaceExhausted => Self::KeySpaceExhausted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub reconciled: usize,
    pub state_changed: bool,
}

/// Drives one record list through a single request.
///
/// Mode is fixed at construction. In editable mode the removed-record ledger travels in the
/// `{ns}RecordsRemoved` / `{ns}RecordsRemovedHash` carrier fields, and the identities placed by
/// `replace_records` travel in `{ns}RecordsIdentities` / `{ns}RecordsIdentitiesHash`.
pub struct RecordListController<F: RecordFactory> {
    config: RecordListConfig,
    factory: F,
    codec: Arc<IntegrityCodec>,
    records: RecordSet<F::Binding>,
    ledger: Option<RemovedLedger<F::Record>>,
    roster: Option<IdentityRoster>,
}

impl<F: RecordFactory> RecordListController<F> {
    pub fn new(
        options: RecordListOptions,
        factory: F,
        codec: Arc<IntegrityCodec>,
    ) -> Result<Self, RecordListError> {
        let config = options.resolve()?;
        let (ledger, roster) = match config.mode {
            RecordListMode::ReadOnly => (None, None),
            RecordListMode::Editable => (
                Some(RemovedLedger::empty(&codec)?),
                Some(IdentityRoster::empty(&codec)?),
            ),
        };
        Ok(Self {
            config,
            factory,
            codec,
            records: RecordSet::new(),
            ledger,
            roster,
        })
    }

    /// Builds a read-only list populated once from `records`.
    pub fn read_only(
        options: RecordListOptions,
        factory: F,
        codec: Arc<IntegrityCodec>,
        records: &[F::Record],
    ) -> Result<Self, RecordListError> {
        let mut controller = Self::new(options.read_only(true), factory, codec)?;
        controller.records.replace_all(&controller.factory, records)?;
        Ok(controller)
    }

    pub fn mode(&self) -> RecordListMode {
        self.config.mode
    }

    pub fn namespace(&self) -> &RecordListNamespace {
        &self.config.namespace
    }

    pub fn labels(&self) -> &RecordLabels {
        &self.config.labels
    }

    pub fn messages(&self) -> &RecordListMessages {
        &self.config.messages
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn binding(&self, key: RecordKey) -> Option<&F::Binding> {
        self.records.get(key)
    }

    /// Write access for the field machinery; `None` in read-only mode.
    pub fn binding_mut(&mut self, key: RecordKey) -> Option<&mut F::Binding> {
        if self.config.mode.is_read_only() {
            return None;
        }
        self.records.get_mut(key)
    }

    /// Ensures a binding exists for every submitted record key; returns how many were created.
    pub fn reconcile_submitted(&mut self, submitted: &SubmittedData) -> usize {
        if self.config.mode.is_read_only() {
            return 0;
        }
        let Some(list) = submitted.records(&self.config.namespace.records_field()) else {
            return 0;
        };
        let mut created = 0;
        for key in list.keys() {
            if self
                .records
                .ensure_at(key, || self.factory.new_empty_record())
            {
                created += 1;
            }
        }
        debug!(
            namespace = self.config.namespace.as_str(),
            submitted = list.len(),
            created,
            "record list reconciled"
        );
        created
    }

    /// Add wins over remove; only the first remove signal in ascending key order is honored.
    pub fn handle_add_remove(
        &mut self,
        submitted: &SubmittedData,
    ) -> Result<bool, RecordListError> {
        if self.config.mode.is_read_only() {
            return Ok(false);
        }

        if submitted.has_scalar(&self.config.namespace.add_field()) {
            let key = self.records.next_key()?;
            self.records.insert_at(key, self.factory.new_empty_record());
            debug!(namespace = self.config.namespace.as_str(), %key, "record added");
            return Ok(true);
        }

        let Some(key) = submitted
            .records(&self.config.namespace.records_field())
            .and_then(|list| list.first_remove_signal())
        else {
            return Ok(false);
        };

        let binding = self
            .records
            .get(key)
            .ok_or(RecordListError::NotFound { key })?;
        let record = self.factory.extract_record(binding);
        if record.is_persisted() {
            let next_roster = self.vouched_roster_without(key, &record)?;
            let ledger = self.ledger.as_mut().ok_or(RecordListError::ReadOnly)?;
            ledger.append(&self.codec, record).map_err(|err| {
                warn!(
                    namespace = self.config.namespace.as_str(),
                    %key,
                    error = %err,
                    "remove refused: carrier failed verification"
                );
                err
            })?;
            self.roster = Some(next_roster);
        }
        self.records.remove_at(key)?;
        debug!(namespace = self.config.namespace.as_str(), %key, "record removed");
        Ok(true)
    }

    /// Checks that `record`'s identity is the one this form sealed at `key`; returns the roster
    /// with that key dropped, for the caller to install once the removal commits.
    fn vouched_roster_without(
        &self,
        key: RecordKey,
        record: &F::Record,
    ) -> Result<IdentityRoster, RecordListError> {
        let roster = self.roster.as_ref().ok_or(RecordListError::ReadOnly)?;
        let vouched = match record.record_id() {
            Some(id) => roster.vouches_for(&self.codec, key, id)?,
            None => false,
        };
        if !vouched {
            warn!(
                namespace = self.config.namespace.as_str(),
                %key,
                "remove refused: record identity not issued by this form"
            );
            return Err(RecordListError::UnverifiedIdentity { key });
        }
        Ok(roster.without(&self.codec, key)?)
    }

    /// Post-diff working set; empty in read-only mode.
    pub fn changed_records(&self) -> BTreeMap<RecordKey, F::Record> {
        if self.config.mode.is_read_only() {
            return BTreeMap::new();
        }
        self.records
            .entries()
            .map(|(key, binding)| (key, self.factory.extract_record(binding)))
            .collect()
    }

    /// Verifies the carrier; tampering is surfaced, never corrected.
    pub fn removed_records(&self) -> Result<Vec<F::Record>, RecordListError> {
        match &self.ledger {
            None => Ok(Vec::new()),
            Some(ledger) => Ok(ledger.records(&self.codec)?),
        }
    }

    pub fn replace_records(&mut self, records: &[F::Record]) -> Result<(), RecordListError> {
        if self.config.mode.is_read_only() {
            return Err(RecordListError::ReadOnly);
        }
        self.records.replace_all(&self.factory, records)?;
        let identities: BTreeMap<RecordKey, RecordId> = self
            .records
            .keys()
            .zip(records)
            .filter_map(|(key, record)| record.record_id().map(|id| (key, id.clone())))
            .collect();
        self.roster = Some(IdentityRoster::seal(&self.codec, &identities)?);
        Ok(())
    }

    /// Current entries in key order, in either mode; for display.
    pub fn display_records(&self) -> Vec<(RecordKey, F::Record)> {
        self.records
            .entries()
            .map(|(key, binding)| (key, self.factory.extract_record(binding)))
            .collect()
    }

    pub fn carrier_fields(&self) -> Option<CarrierFields> {
        let carrier = self.ledger.as_ref()?.carrier();
        let roster = self.roster.as_ref()?.carrier();
        Some(CarrierFields {
            removed: CarrierField {
                name: self.config.namespace.removed_field(),
                value: carrier.payload.clone(),
            },
            removed_hash: CarrierField {
                name: self.config.namespace.removed_hash_field(),
                value: carrier.tag.clone(),
            },
            identities: CarrierField {
                name: self.config.namespace.identities_field(),
                value: roster.payload.clone(),
            },
            identities_hash: CarrierField {
                name: self.config.namespace.identities_hash_field(),
                value: roster.tag.clone(),
            },
        })
    }

    pub fn view(&self) -> RecordListView<F::Record> {
        let editable = !self.config.mode.is_read_only();
        let records_field = self.config.namespace.records_field();
        let entries = self
            .display_records()
            .into_iter()
            .map(|(key, record)| {
                let field_prefix = format!("{records_field}[{key}]");
                RecordEntryView {
                    key,
                    remove_field: editable
                        .then(|| format!("{field_prefix}[{REMOVE_SIGNAL_FIELD}]")),
                    field_prefix,
                    record,
                }
            })
            .collect();
        RecordListView {
            namespace: self.config.namespace.as_str().to_string(),
            mode: self.config.mode,
            labels: self.config.labels.clone(),
            messages: self.config.messages.clone(),
            records_field,
            entries,
            carrier: self.carrier_fields(),
            add_field: editable.then(|| self.config.namespace.add_field()),
            submit_field: (editable && self.config.messages.submit.is_some())
                .then(|| self.config.namespace.submit_field()),
        }
    }
}

impl<F> RecordListController<F>
where
    F: RecordFactory,
    F::Binding: FieldBinding,
{
    /// Writes submitted per-record values into existing bindings and loads the echoed carriers.
    ///
    /// When only one field of a carrier comes back the other is taken as empty, which fails
    /// verification on the next read.
    pub fn populate_submitted(&mut self, submitted: &SubmittedData) {
        if self.config.mode.is_read_only() {
            return;
        }

        let payload = submitted.scalar(&self.config.namespace.removed_field());
        let tag = submitted.scalar(&self.config.namespace.removed_hash_field());
        if payload.is_some() || tag.is_some() {
            if let Some(ledger) = self.ledger.as_mut() {
                ledger.restore_carrier(IntegrityEnvelope::new(
                    payload.unwrap_or_default(),
                    tag.unwrap_or_default(),
                ));
            }
        }
        let payload = submitted.scalar(&self.config.namespace.identities_field());
        let tag = submitted.scalar(&self.config.namespace.identities_hash_field());
        if payload.is_some() || tag.is_some() {
            if let Some(roster) = self.roster.as_mut() {
                roster.restore_carrier(IntegrityEnvelope::new(
                    payload.unwrap_or_default(),
                    tag.unwrap_or_default(),
                ));
            }
        }

        let Some(list) = submitted.records(&self.config.namespace.records_field()) else {
            return;
        };
        for (key, fields) in list.iter() {
            if let Some(binding) = self.records.get_mut(key) {
                for (field, value) in fields.values() {
                    binding.assign_field(field, value);
                }
            }
        }
    }

    /// One full submission pass: reconcile, populate, then add/remove.
    pub fn process_submission(
        &mut self,
        submitted: &SubmittedData,
    ) -> Result<SubmissionOutcome, RecordListError> {
        let reconciled = self.reconcile_submitted(submitted);
        self.populate_submitted(submitted);
        let state_changed = self.handle_add_remove(submitted)?;
        Ok(SubmissionOutcome {
            reconciled,
            state_changed,
        })
    }
}
