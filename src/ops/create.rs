//! Task creation as the user drives it: validate the title, consult the
//! weather for outdoor tasks, honour an explicit "create anyway".

use tokio::sync::oneshot;

use crate::model::task::TaskDraft;
use crate::ops::ValidationError;
use crate::store::{Store, StoreError};
use crate::weather::{WeatherError, WeatherGate, WeatherReport};

/// Error type for task creation
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a weather check is already in progress")]
    InFlight,
    #[error(
        "weather is not suitable for outdoor tasks ({}°C, {})",
        .0.temperature,
        .0.condition
    )]
    Unsuitable(WeatherReport),
    #[error("could not confirm the weather: {0}")]
    Unconfirmed(WeatherError),
    #[error("weather check cancelled")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Trim the title and reject it if nothing is left
pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Weather check
// ---------------------------------------------------------------------------

/// How a weather check came out
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    Suitable(WeatherReport),
    Unsuitable(WeatherReport),
    /// The lookup failed; suitability is unknown, not assumed
    Unconfirmed(WeatherError),
    /// The requester went away before the answer arrived
    Cancelled,
}

/// Ask `gate` about `location`, giving up as soon as `cancel` fires or its
/// sender is dropped. A late answer after cancellation is discarded.
pub async fn check_outdoor<G: WeatherGate>(
    gate: &G,
    location: &str,
    cancel: oneshot::Receiver<()>,
) -> GateVerdict {
    tokio::select! {
        result = gate.fetch(location) => match result {
            Ok(report) if report.is_good_time => GateVerdict::Suitable(report),
            Ok(report) => GateVerdict::Unsuitable(report),
            Err(e) => {
                tracing::warn!(location, error = %e, "weather check failed");
                GateVerdict::Unconfirmed(e)
            }
        },
        _ = cancel => {
            tracing::debug!(location, "weather check cancelled");
            GateVerdict::Cancelled
        }
    }
}

/// Map a verdict and the user's override to create-or-abort
pub fn decide(verdict: GateVerdict, create_anyway: bool) -> Result<Option<WeatherReport>, CreateError> {
    match verdict {
        GateVerdict::Suitable(report) => Ok(Some(report)),
        GateVerdict::Unsuitable(report) if create_anyway => Ok(Some(report)),
        GateVerdict::Unsuitable(report) => Err(CreateError::Unsuitable(report)),
        GateVerdict::Unconfirmed(_) if create_anyway => Ok(None),
        GateVerdict::Unconfirmed(e) => Err(CreateError::Unconfirmed(e)),
        GateVerdict::Cancelled => Err(CreateError::Cancelled),
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// Tracks the one weather check allowed at a time
#[derive(Debug, Default)]
pub struct CreationFlow {
    pending: Option<oneshot::Sender<()>>,
}

impl CreationFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a started check has not yet finished or been cancelled
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Start a check. Returns the receiver the check listens on for cancellation.
    pub fn begin(&mut self) -> Result<oneshot::Receiver<()>, CreateError> {
        if self.is_pending() {
            return Err(CreateError::InFlight);
        }
        let (tx, rx) = oneshot::channel();
        self.pending = Some(tx);
        Ok(rx)
    }

    /// Abandon the current check, e.g. when the requesting view goes away
    pub fn cancel(&mut self) {
        if let Some(tx) = self.pending.take() {
            let _ = tx.send(());
        }
    }
}

/// A new task request
#[derive(Debug, Clone)]
pub struct NewTask {
    pub draft: TaskDraft,
    /// Where to check the weather when the task is outdoor
    pub location: String,
    pub create_anyway: bool,
}

/// A created task and the weather it was checked against, if any
#[derive(Debug, Clone)]
pub struct Created {
    pub id: String,
    pub weather: Option<WeatherReport>,
}

/// Validate, consult the weather for outdoor tasks, then add the task.
pub async fn submit<G: WeatherGate>(
    store: &mut Store,
    flow: &mut CreationFlow,
    gate: &G,
    request: NewTask,
) -> Result<Created, CreateError> {
    let mut draft = request.draft;
    draft.title = validate_title(&draft.title)?;

    let weather = if draft.is_outdoor.unwrap_or(false) {
        let cancel = flow.begin()?;
        let verdict = check_outdoor(gate, &request.location, cancel).await;
        flow.pending = None;
        decide(verdict, request.create_anyway)?
    } else {
        None
    };

    let id = store.add_task(draft)?;
    Ok(Created { id, weather })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::MemoryStorage;
    use crate::model::config::StoreConfig;
    use crate::weather::{UnavailableGate, WeatherRules, assess};
    use std::future::Future;
    use std::time::Duration;

    struct FixedGate(f64, &'static str);

    impl WeatherGate for FixedGate {
        fn fetch(&self, _location: &str) -> impl Future<Output = Result<WeatherReport, WeatherError>> + Send {
            let report = assess(self.0, self.1, &WeatherRules::default());
            async move { Ok(report) }
        }
    }

    struct SlowGate;

    impl WeatherGate for SlowGate {
        fn fetch(&self, _location: &str) -> impl Future<Output = Result<WeatherReport, WeatherError>> + Send {
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(assess(20.0, "Clear", &WeatherRules::default()))
            }
        }
    }

    fn store() -> Store {
        Store::open(Box::new(MemoryStorage::new()), StoreConfig::default())
    }

    fn outdoor(title: &str, create_anyway: bool) -> NewTask {
        let mut draft = TaskDraft::titled(title);
        draft.is_outdoor = Some(true);
        NewTask {
            draft,
            location: "India".into(),
            create_anyway,
        }
    }

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  Mow lawn "), Ok("Mow lawn".to_string()));
        assert_eq!(validate_title("   "), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn test_decide() {
        let good = assess(20.0, "Clear", &WeatherRules::default());
        let bad = assess(35.0, "Clear", &WeatherRules::default());
        assert!(decide(GateVerdict::Suitable(good), false).is_ok());
        assert!(matches!(
            decide(GateVerdict::Unsuitable(bad.clone()), false),
            Err(CreateError::Unsuitable(_))
        ));
        assert_eq!(decide(GateVerdict::Unsuitable(bad.clone()), true).unwrap(), Some(bad));
        assert!(matches!(
            decide(GateVerdict::Unconfirmed(WeatherError::MissingApiKey), false),
            Err(CreateError::Unconfirmed(_))
        ));
        assert_eq!(
            decide(GateVerdict::Unconfirmed(WeatherError::MissingApiKey), true).unwrap(),
            None
        );
        assert!(matches!(
            decide(GateVerdict::Cancelled, true),
            Err(CreateError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_indoor_task_skips_weather() {
        let mut store = store();
        let mut flow = CreationFlow::new();
        let request = NewTask {
            draft: TaskDraft::titled(" Read "),
            location: "India".into(),
            create_anyway: false,
        };
        let gate = UnavailableGate(WeatherError::MissingApiKey);
        let created = submit(&mut store, &mut flow, &gate, request).await.unwrap();
        assert!(created.weather.is_none());
        assert_eq!(store.state().task(&created.id).unwrap().title, "Read");
    }

    #[tokio::test]
    async fn test_empty_title_rejected_without_state_change() {
        let mut store = store();
        let mut flow = CreationFlow::new();
        let err = submit(&mut store, &mut flow, &FixedGate(20.0, "Clear"), outdoor(" ", false))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::Validation(ValidationError::EmptyTitle)));
        assert!(store.state().tasks.is_empty());
    }

    #[tokio::test]
    async fn test_outdoor_task_in_good_weather() {
        let mut store = store();
        let mut flow = CreationFlow::new();
        let created = submit(&mut store, &mut flow, &FixedGate(22.0, "Clear"), outdoor("Hike", false))
            .await
            .unwrap();
        assert!(created.weather.unwrap().is_good_time);
        assert!(store.state().task(&created.id).unwrap().is_outdoor());
        assert!(!flow.is_pending());
    }

    #[tokio::test]
    async fn test_outdoor_task_in_rain_needs_override() {
        let mut store = store();
        let mut flow = CreationFlow::new();
        let err = submit(&mut store, &mut flow, &FixedGate(20.0, "Rain"), outdoor("Hike", false))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::Unsuitable(_)));
        assert!(store.state().tasks.is_empty());

        let created = submit(&mut store, &mut flow, &FixedGate(20.0, "Rain"), outdoor("Hike", true))
            .await
            .unwrap();
        assert_eq!(created.weather.unwrap().condition, "Rain");
        assert_eq!(store.state().tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_good_weather() {
        let mut store = store();
        let mut flow = CreationFlow::new();
        let gate = UnavailableGate(WeatherError::LocationNotFound("India".into()));
        let err = submit(&mut store, &mut flow, &gate, outdoor("Hike", false))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CreateError::Unconfirmed(WeatherError::LocationNotFound(_))
        ));
        assert!(store.state().tasks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_check_drops_result() {
        let mut flow = CreationFlow::new();
        let rx = flow.begin().unwrap();
        assert!(flow.is_pending());
        assert!(matches!(flow.begin(), Err(CreateError::InFlight)));

        let check = check_outdoor(&SlowGate, "India", rx);
        flow.cancel();
        assert_eq!(check.await, GateVerdict::Cancelled);
        assert!(!flow.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_requester_cancels() {
        let mut flow = CreationFlow::new();
        let rx = flow.begin().unwrap();
        drop(flow);
        assert_eq!(check_outdoor(&SlowGate, "India", rx).await, GateVerdict::Cancelled);
    }
}
