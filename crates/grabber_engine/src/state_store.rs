use std::sync::{Arc, Mutex};

use grabber_core::{
    update, ChangeSet, CoordinationState, DepotId, Effect, Msg, ALL_KEYS, CHANGES_KEY, DEPOT_KEY,
    MANIFEST_KEY, READY_TO_EXPORT_KEY, VISIT_IN_FLIGHT_KEY,
};
use grabber_logging::{grabber_trace, grabber_warn};
use serde_json::Value;

use crate::store::{KeyValueStore, StoreError};

/// Typed view of the coordination keys in a [`KeyValueStore`].
///
/// [`StateStore::apply`] is the only way the state machine touches storage:
/// load, run [`update`], write back just the keys that changed.
#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KeyValueStore>,
    txn: Arc<Mutex<()>>,
}

impl StateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            txn: Arc::new(Mutex::new(())),
        }
    }

    pub fn apply(&self, msg: Msg) -> Result<Vec<Effect>, StoreError> {
        let _guard = self.txn.lock().map_err(|_| StoreError::Poisoned)?;
        let before = self.load()?;
        grabber_trace!("apply {:?}", msg);
        let (after, effects) = update(before.clone(), msg);
        self.commit(&before, &after)?;
        Ok(effects)
    }

    pub fn load(&self) -> Result<CoordinationState, StoreError> {
        let aggregate = match self.kv.get_or(CHANGES_KEY, Value::Null)? {
            Value::Null => None,
            // Older state files held the record as a JSON string.
            Value::String(text) => Some(
                serde_json::from_str::<ChangeSet>(&text).map_err(|err| corrupt(CHANGES_KEY, err))?,
            ),
            value => Some(
                serde_json::from_value::<ChangeSet>(value).map_err(|err| corrupt(CHANGES_KEY, err))?,
            ),
        };

        Ok(CoordinationState {
            aggregate,
            depot_id: self.optional_string(DEPOT_KEY)?.map(DepotId::new),
            manifest_id: self.optional_string(MANIFEST_KEY)?,
            visit_in_flight: self.flag(VISIT_IN_FLIGHT_KEY)?,
            ready_to_export: self.flag(READY_TO_EXPORT_KEY)?,
        })
    }

    pub fn visit_in_flight(&self) -> Result<bool, StoreError> {
        self.flag(VISIT_IN_FLIGHT_KEY)
    }

    pub fn ready_to_export(&self) -> Result<bool, StoreError> {
        self.flag(READY_TO_EXPORT_KEY)
    }

    /// Clear every key. Works even when stored values no longer parse.
    pub fn reset(&self) -> Result<(), StoreError> {
        match self.apply(Msg::ResetClicked) {
            Ok(_) => Ok(()),
            Err(StoreError::Corrupt { key, message }) => {
                grabber_warn!("Discarding malformed {}: {}", key, message);
                let _guard = self.txn.lock().map_err(|_| StoreError::Poisoned)?;
                let cleared = CoordinationState::new();
                for key in ALL_KEYS {
                    self.kv.set(key, value_for(&cleared, key)?)?;
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn commit(&self, before: &CoordinationState, after: &CoordinationState) -> Result<(), StoreError> {
        for key in before.changed_keys(after) {
            self.kv.set(key, value_for(after, key)?)?;
        }
        Ok(())
    }

    fn optional_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.kv.get_or(key, Value::Null)? {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(text)),
            Value::Number(number) => Ok(Some(number.to_string())),
            other => Err(StoreError::Corrupt {
                key: key.to_string(),
                message: format!("expected a string, found {other}"),
            }),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, StoreError> {
        Ok(match self.kv.get_or(key, Value::Bool(false))? {
            Value::Bool(flag) => flag,
            // Queue counters from older state files: non-zero means set.
            Value::Number(count) => count.as_i64().is_some_and(|n| n > 0),
            _ => false,
        })
    }
}

fn value_for(state: &CoordinationState, key: &str) -> Result<Value, StoreError> {
    Ok(match key {
        CHANGES_KEY => match &state.aggregate {
            Some(aggregate) => serde_json::to_value(aggregate)?,
            None => Value::Null,
        },
        DEPOT_KEY => state
            .depot_id
            .as_ref()
            .map_or(Value::Null, |depot| Value::String(depot.to_string())),
        MANIFEST_KEY => state
            .manifest_id
            .clone()
            .map_or(Value::Null, Value::String),
        VISIT_IN_FLIGHT_KEY => Value::Bool(state.visit_in_flight),
        READY_TO_EXPORT_KEY => Value::Bool(state.ready_to_export),
        other => {
            return Err(StoreError::Corrupt {
                key: other.to_string(),
                message: "not a coordination key".to_string(),
            })
        }
    })
}

fn corrupt(key: &str, err: serde_json::Error) -> StoreError {
    StoreError::Corrupt {
        key: key.to_string(),
        message: err.to_string(),
    }
}
