//! The search view: one task that owns all view state and reacts to user
//! commands, async completions, unit broadcasts and the debounce timer.
//!
//! Async work (lookups, weather fetches, recommendations) runs in tasks that
//! post a [`Completion`] back, tagged with the generation that issued it.
//! A completion whose generation is no longer current is dropped on arrival,
//! which gives latest-request-wins without aborting anything in flight.

use std::sync::Arc;

use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinSet,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::SearchSettings,
    error::LookupError,
    favorites::FavoritesStore,
    joiner::{self, Branch, WeatherReport},
    loader::LoaderCounter,
    model::{CurrentWeatherSample, Location},
    notify::Notifier,
    panel::{CurrentDisplay, ForecastDisplay, WeatherPanel},
    provider::{LocationLookup, Recommender, WeatherSource},
    query::{Debounce, SearchQuery},
    selection::SelectionController,
    units::{UnitBroadcast, UnitSystem},
};

/// Collaborators a view talks to.
#[derive(Debug, Clone)]
pub struct Services {
    pub lookup: Arc<dyn LocationLookup>,
    pub weather: Arc<dyn WeatherSource>,
    pub favorites: Arc<dyn FavoritesStore>,
    pub notifier: Arc<dyn Notifier>,
    pub recommender: Option<Arc<dyn Recommender>>,
}

/// Process-wide state shared by every view.
#[derive(Debug, Clone, Default)]
pub struct Shared {
    pub units: UnitBroadcast,
    pub loader: LoaderCounter,
}

/// Snapshot published after every state change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Text shown in the search box.
    pub query: String,
    pub candidates: Vec<Location>,
    pub selected: Option<Location>,
    pub is_favorite: bool,
    pub current: Option<CurrentDisplay>,
    pub forecast: Vec<ForecastDisplay>,
    pub recommendation: Option<String>,
    pub units: UnitSystem,
}

#[derive(Debug)]
enum Command {
    Edit(String),
    Select(Location),
    SelectCandidate(usize),
    ToggleFavorite,
    DeepLink(String),
}

#[derive(Debug)]
enum Completion {
    Candidates { generation: u64, outcome: anyhow::Result<Vec<Location>> },
    Resolved { generation: u64, key: String, outcome: anyhow::Result<Option<Location>> },
    Weather { generation: u64, key: String, report: WeatherReport },
    Recommendation { generation: u64, outcome: anyhow::Result<String> },
}

/// Monotonic request counter; only the latest issued value is current.
#[derive(Debug, Default)]
struct Generation(u64);

impl Generation {
    fn advance(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    fn is_current(&self, generation: u64) -> bool {
        self.0 == generation
    }
}

/// Handle to a running view. Dropping it disposes the view.
#[derive(Debug)]
pub struct ViewHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ViewState>,
    cancel: CancellationToken,
}

impl ViewHandle {
    /// Raw edit of the search box.
    pub fn edit(&self, text: impl Into<String>) {
        self.send(Command::Edit(text.into()));
    }

    pub fn select(&self, location: Location) {
        self.send(Command::Select(location));
    }

    /// Pick from the live candidate list by position.
    pub fn select_candidate(&self, index: usize) {
        self.send(Command::SelectCandidate(index));
    }

    pub fn toggle_favorite(&self) {
        self.send(Command::ToggleFavorite);
    }

    pub fn open_deep_link(&self, key: impl Into<String>) {
        self.send(Command::DeepLink(key.into()));
    }

    pub fn state(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Tear the view down. Pending lookups and fetches are abandoned together.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("command sent to a disposed view");
        }
    }
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start a view on the current runtime. The seed query is resolved right
/// away; a deep-link key, when given, is resolved alongside it.
pub fn spawn_view(
    services: Services,
    shared: Shared,
    settings: SearchSettings,
    deep_link: Option<String>,
) -> ViewHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    let initial = ViewState { units: shared.units.current(), ..ViewState::default() };
    let (state_tx, state_rx) = watch::channel(initial);
    let cancel = CancellationToken::new();

    let view = SearchView {
        selection: SelectionController::new(services.favorites.clone(), services.notifier.clone()),
        debounce: Debounce::new(settings.debounce()),
        services,
        shared,
        settings,
        search_gen: Generation::default(),
        fetch_gen: Generation::default(),
        preload_gen: Generation::default(),
        auto_pick_pending: true,
        query: String::new(),
        candidates: Vec::new(),
        panel: WeatherPanel::default(),
        recommendation: None,
        tasks: JoinSet::new(),
        completions: completions_tx,
        state: state_tx,
    };

    tokio::spawn(view.run(commands_rx, completions_rx, cancel.clone(), deep_link));

    ViewHandle { commands: commands_tx, state: state_rx, cancel }
}

struct SearchView {
    services: Services,
    shared: Shared,
    settings: SearchSettings,
    debounce: Debounce<String>,
    search_gen: Generation,
    fetch_gen: Generation,
    preload_gen: Generation,
    auto_pick_pending: bool,
    query: String,
    candidates: Vec<Location>,
    selection: SelectionController,
    panel: WeatherPanel,
    recommendation: Option<String>,
    tasks: JoinSet<()>,
    completions: mpsc::UnboundedSender<Completion>,
    state: watch::Sender<ViewState>,
}

impl SearchView {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        cancel: CancellationToken,
        deep_link: Option<String>,
    ) {
        let mut unit_changes = self.shared.units.subscribe();

        // First emission skips the idle window.
        self.query = self.settings.seed_query.clone();
        self.submit(self.settings.seed_query.clone());
        if let Some(key) = deep_link {
            self.preload(key);
        }
        self.publish();

        loop {
            let deadline = self.debounce.deadline();
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },

                Some(done) = completions.recv() => self.apply(done),

                notice = unit_changes.recv() => match notice {
                    // A lagged receiver only missed duplicates; the flag is re-read anyway.
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        self.panel.recompute(self.shared.units.current());
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                },

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    if let Some(text) = self.debounce.take_due(Instant::now()) {
                        self.submit(text);
                    }
                }

                Some(_) = self.tasks.join_next(), if !self.tasks.is_empty() => {}
            }
            self.publish();
        }

        self.tasks.abort_all();
        tracing::debug!("search view disposed");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Edit(text) => self.edit(text),
            Command::Select(location) => self.select(location),
            Command::SelectCandidate(index) => match self.candidates.get(index).cloned() {
                Some(location) => self.select(location),
                None => tracing::debug!(index, "no candidate at index"),
            },
            Command::ToggleFavorite => {
                self.selection.toggle_favorite();
            }
            Command::DeepLink(key) => self.preload(key),
        }
    }

    fn edit(&mut self, text: String) {
        if text.is_empty() {
            self.debounce.cancel();
            self.clear();
        } else {
            self.debounce.push(text.clone(), Instant::now());
        }
        self.query = text;
    }

    /// Emptied search box: drop everything that depended on it, including
    /// whatever is still in flight.
    fn clear(&mut self) {
        self.search_gen.advance();
        self.fetch_gen.advance();
        self.preload_gen.advance();
        self.candidates.clear();
        self.selection.clear();
        self.panel.clear();
        self.recommendation = None;
    }

    /// Validate and hand a query to the resolver. Invalid text is dropped silently.
    fn submit(&mut self, text: String) {
        let query = match SearchQuery::parse(&text) {
            Ok(query) => query,
            Err(reason) => {
                tracing::debug!(%text, %reason, "query suppressed");
                return;
            }
        };

        let generation = self.search_gen.advance();
        let lookup = self.services.lookup.clone();
        let completions = self.completions.clone();
        tracing::debug!(%query, generation, "autocomplete issued");

        self.tasks.spawn(async move {
            let outcome = lookup.autocomplete(query.as_str()).await;
            let _ = completions.send(Completion::Candidates { generation, outcome });
        });
    }

    fn preload(&mut self, key: String) {
        let generation = self.preload_gen.advance();
        let lookup = self.services.lookup.clone();
        let completions = self.completions.clone();
        tracing::debug!(%key, generation, "deep link lookup issued");

        self.tasks.spawn(async move {
            let outcome = lookup.by_key(&key).await;
            let _ = completions.send(Completion::Resolved { generation, key, outcome });
        });
    }

    fn select(&mut self, location: Location) {
        let name = location.name.clone();
        let key = location.key.clone();
        if !self.selection.select(location) {
            return;
        }
        tracing::info!(%key, %name, "location selected");
        // Set silently: this never goes through the debounce pipeline.
        self.query = name;
        self.start_fetch(key);
    }

    fn start_fetch(&mut self, key: String) {
        let generation = self.fetch_gen.advance();
        self.recommendation = None;
        let busy = self.shared.loader.begin();
        let weather = self.services.weather.clone();
        let completions = self.completions.clone();

        self.tasks.spawn(async move {
            let report = joiner::join_weather(weather.as_ref(), &key, busy).await;
            let _ = completions.send(Completion::Weather { generation, key, report });
        });
    }

    fn apply(&mut self, done: Completion) {
        match done {
            Completion::Candidates { generation, outcome } => {
                if !self.search_gen.is_current(generation) {
                    tracing::debug!(generation, "stale autocomplete result dropped");
                    return;
                }
                match outcome {
                    Ok(found) => self.accept_candidates(found),
                    Err(cause) => {
                        let err = LookupError::Autocomplete(cause);
                        tracing::warn!(error = %err, "autocomplete failed");
                        self.services.notifier.show_error(err.user_message());
                        self.candidates.clear();
                    }
                }
            }
            Completion::Resolved { generation, key, outcome } => {
                if !self.preload_gen.is_current(generation) {
                    tracing::debug!(%key, generation, "stale deep link result dropped");
                    return;
                }
                self.accept_resolved(key, outcome);
            }
            Completion::Weather { generation, key, report } => {
                if !self.fetch_gen.is_current(generation) {
                    tracing::debug!(%key, generation, "stale weather report dropped");
                    return;
                }
                self.accept_weather(generation, report);
            }
            Completion::Recommendation { generation, outcome } => {
                if !self.fetch_gen.is_current(generation) {
                    return;
                }
                match outcome {
                    Ok(text) => self.recommendation = Some(text),
                    Err(e) => {
                        tracing::debug!(error = %format!("{e:#}"), "recommendation unavailable")
                    }
                }
            }
        }
    }

    fn accept_resolved(&mut self, key: String, outcome: anyhow::Result<Option<Location>>) {
        match outcome {
            Ok(Some(location)) => self.select(location),
            Ok(None) => tracing::debug!(%key, "deep link resolved to nothing"),
            Err(source) => {
                let err = LookupError::ByKey { key, source };
                tracing::warn!(error = %err, "deep link resolution failed");
                self.services.notifier.show_error(err.user_message());
            }
        }
    }

    fn accept_candidates(&mut self, found: Vec<Location>) {
        tracing::debug!(count = found.len(), "candidates received");
        let auto_pick = if self.auto_pick_pending && !found.is_empty() {
            self.auto_pick_pending = false;
            found.iter().find(|l| l.name == self.settings.preferred_default).cloned()
        } else {
            None
        };

        self.candidates = found;
        if let Some(preferred) = auto_pick {
            tracing::info!(name = %preferred.name, "auto-selecting preferred default");
            self.select(preferred);
        }
    }

    fn accept_weather(&mut self, generation: u64, report: WeatherReport) {
        for failure in report.failures() {
            self.services.notifier.show_error(failure.user_message());
        }

        let units = self.shared.units.current();
        let WeatherReport { current, forecast } = report;

        match current {
            Branch::Ready(sample) => {
                self.recommend(generation, &sample);
                self.panel.set_current(Some(sample), units);
            }
            Branch::Failed(_) => self.panel.set_current(None, units),
        }
        self.panel.set_forecast(forecast.ready().unwrap_or_default(), units);
    }

    /// Fire-and-forget clothing advice for a fresh sample.
    fn recommend(&mut self, generation: u64, sample: &CurrentWeatherSample) {
        self.recommendation = None;
        let Some(recommender) = self.services.recommender.clone() else {
            return;
        };
        let prompt = sample.clothing_prompt();
        let completions = self.completions.clone();

        self.tasks.spawn(async move {
            let outcome = recommender.generate(&prompt).await;
            let _ = completions.send(Completion::Recommendation { generation, outcome });
        });
    }

    fn publish(&self) {
        let next = ViewState {
            query: self.query.clone(),
            candidates: self.candidates.clone(),
            selected: self.selection.selected().cloned(),
            is_favorite: self.selection.is_favorite(),
            current: self.panel.current_display().cloned(),
            forecast: self.panel.forecast_display().to_vec(),
            recommendation: self.recommendation.clone(),
            units: self.shared.units.current(),
        };
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}
