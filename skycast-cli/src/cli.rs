use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use skycast_core::{
    ChannelNotifier, Config, Favorites, FavoritesStore, FileStore, LoaderCounter, Notice,
    ProviderId, SearchSettings, Services, Shared, UnitBroadcast, UnitSystem, ViewHandle, ViewState,
    provider::{accuweather_from_config, recommender_from_config},
    query::SearchQuery,
    spawn_view,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Location search and weather lookup")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "accuweather" or "openai".
        provider: String,
    },

    /// Search locations; shows weather when the preferred default is among the results.
    Search {
        /// Search text. Defaults to the configured seed query.
        query: Option<String>,

        /// Show temperatures in Fahrenheit.
        #[arg(long)]
        imperial: bool,

        /// Seconds to wait for each provider round trip.
        #[arg(long, default_value_t = 15)]
        timeout: u64,
    },

    /// Show weather for a location key.
    Show {
        /// Provider location key, e.g. "215854".
        key: String,

        #[arg(long)]
        imperial: bool,

        #[arg(long, default_value_t = 15)]
        timeout: u64,
    },

    /// Line-driven search session.
    Interactive {
        /// Location key to open right away.
        #[arg(long)]
        key: Option<String>,

        #[arg(long)]
        imperial: bool,
    },

    /// List stored favorites.
    Favorites,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Search { query, imperial, timeout } => {
                let config = Config::load()?;
                let units = units_for(&config, imperial);
                search(config, query, units, Duration::from_secs(timeout)).await
            }
            Command::Show { key, imperial, timeout } => {
                let config = Config::load()?;
                let units = units_for(&config, imperial);
                show(config, key, units, Duration::from_secs(timeout)).await
            }
            Command::Interactive { key, imperial } => {
                let config = Config::load()?;
                let units = units_for(&config, imperial);
                interactive(config, key, units).await
            }
            Command::Favorites => {
                print!("{}", render::favorites(&open_favorites()?.list()));
                Ok(())
            }
        }
    }
}

fn units_for(config: &Config, imperial: bool) -> UnitSystem {
    if imperial { UnitSystem::Imperial } else { config.units }
}

fn configure(provider: &str) -> Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = inquire::Password::new(&format!("{id} API key:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key.to_string());
    config.save()?;
    tracing::info!(provider = %id, "stored provider credentials");
    println!("Saved {id} credentials to {}", Config::config_file_path()?.display());
    Ok(())
}

fn open_favorites() -> Result<Arc<Favorites>> {
    let dir = Config::data_dir()?;
    Ok(Arc::new(Favorites::open(Box::new(FileStore::new(dir)))?))
}

/// How a bounded wait on the view ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Reached,
    Failed,
    TimedOut,
}

/// One running view plus the plumbing the CLI reads from.
struct Session {
    view: ViewHandle,
    shared: Shared,
    favorites: Arc<Favorites>,
    notices: mpsc::UnboundedReceiver<Notice>,
    advises: bool,
}

impl Session {
    fn start(
        config: &Config,
        settings: SearchSettings,
        deep_link: Option<String>,
        units: UnitSystem,
    ) -> Result<Self> {
        let accuweather = accuweather_from_config(config)?;
        let recommender = recommender_from_config(config);
        let favorites = open_favorites()?;
        let (notifier, notices) = ChannelNotifier::new();

        let services = Services {
            lookup: accuweather.clone(),
            weather: accuweather,
            favorites: favorites.clone(),
            notifier: Arc::new(notifier),
            recommender,
        };
        let shared = Shared { units: UnitBroadcast::new(units), loader: LoaderCounter::new() };
        let advises = services.recommender.is_some();
        let seed = &settings.seed_query;
        tracing::debug!(?deep_link, %seed, ?units, advises, "starting search view");
        let view = spawn_view(services, shared.clone(), settings, deep_link);

        Ok(Self { view, shared, favorites, notices, advises })
    }

    /// Wait until `done` holds, `max_errors` error notices arrive, or `timeout` passes.
    /// Notices are printed as they come in.
    async fn wait(
        &mut self,
        timeout: Duration,
        max_errors: usize,
        mut done: impl FnMut(&ViewState) -> bool,
    ) -> Result<(Settled, ViewState)> {
        let mut state = self.view.state();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut errors = 0;

        loop {
            if done(&*state.borrow_and_update()) {
                return Ok((Settled::Reached, state.borrow().clone()));
            }
            if errors >= max_errors {
                return Ok((Settled::Failed, state.borrow().clone()));
            }

            tokio::select! {
                changed = state.changed() => changed.context("Search view stopped unexpectedly")?,
                Some(notice) = self.notices.recv() => {
                    render::notice(&notice);
                    if matches!(notice, Notice::Error(_)) {
                        errors += 1;
                    }
                }
                _ = &mut deadline => return Ok((Settled::TimedOut, state.borrow().clone())),
            }
        }
    }

    /// Wait out the weather fetch for the current selection, then any advice.
    async fn wait_for_weather(&mut self, timeout: Duration) -> Result<ViewState> {
        // Each branch reports its own failure, so two errors mean nothing will arrive.
        let (_, state) = self
            .wait(timeout, 2, |s| s.current.is_some() || !s.forecast.is_empty())
            .await?;
        if !self.advises || state.current.is_none() {
            return Ok(state);
        }
        let (_, state) = self.wait(timeout, usize::MAX, |s| s.recommendation.is_some()).await?;
        Ok(state)
    }
}

async fn search(
    config: Config,
    query: Option<String>,
    units: UnitSystem,
    timeout: Duration,
) -> Result<()> {
    let mut settings = config.search.clone();
    if let Some(query) = query {
        settings.seed_query = query;
    }
    let query = settings.seed_query.clone();
    SearchQuery::parse(&query).with_context(|| format!("Cannot search for '{query}'"))?;

    let mut session = Session::start(&config, settings, None, units)?;
    let (settled, state) = session.wait(timeout, 1, |s| !s.candidates.is_empty()).await?;
    match settled {
        Settled::Reached => print!("{}", render::candidates(&state.candidates)),
        Settled::Failed => return Ok(()),
        Settled::TimedOut => {
            println!("No locations found for '{query}'.");
            return Ok(());
        }
    }

    if state.selected.is_none() {
        println!("Run `skycast show <key>` to see the weather for one of them.");
        return Ok(());
    }

    let state = session.wait_for_weather(timeout).await?;
    println!();
    print!("{}", render::weather(&state));
    session.view.dispose();
    Ok(())
}

async fn show(config: Config, key: String, units: UnitSystem, timeout: Duration) -> Result<()> {
    // No seed: only the deep link drives this view.
    let settings = SearchSettings { seed_query: String::new(), ..config.search.clone() };
    let mut session = Session::start(&config, settings, Some(key.clone()), units)?;

    let (settled, _) = session.wait(timeout, 1, |s| s.selected.is_some()).await?;
    match settled {
        Settled::Reached => {}
        Settled::Failed => return Ok(()),
        Settled::TimedOut => bail!("No location found for key '{key}'"),
    }

    let state = session.wait_for_weather(timeout).await?;
    print!("{}", render::weather(&state));
    session.view.dispose();
    Ok(())
}

/// A line typed in the interactive session.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Edit(String),
    Pick(usize),
    ToggleUnits,
    ToggleFavorite,
    ListFavorites,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(command) = line.strip_prefix(':') else {
        return Input::Edit(line.to_string());
    };
    match command.trim() {
        "q" => Input::Quit,
        "u" => Input::ToggleUnits,
        "f" => Input::ToggleFavorite,
        "l" => Input::ListFavorites,
        "h" => Input::Help,
        n => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Pick(n - 1),
            _ => Input::Help,
        },
    }
}

async fn interactive(config: Config, key: Option<String>, units: UnitSystem) -> Result<()> {
    let mut session = Session::start(&config, config.search.clone(), key, units)?;
    let mut state = session.view.state();
    let mut busy = session.shared.loader.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("{}", render::help());
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Edit(text) => session.view.edit(text),
                    Input::Pick(index) => session.view.select_candidate(index),
                    Input::ToggleUnits => {
                        session.shared.units.toggle();
                    }
                    Input::ToggleFavorite => session.view.toggle_favorite(),
                    Input::ListFavorites => {
                        print!("{}", render::favorites(&session.favorites.list()))
                    }
                    Input::Help => print!("{}", render::help()),
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                println!();
                print!("{}", render::state(&state.borrow_and_update()));
            }
            Some(notice) = session.notices.recv() => render::notice(&notice),
            Ok(()) = busy.changed() => {
                if *busy.borrow_and_update() {
                    println!("(loading...)");
                }
            }
        }
    }

    session.view.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_edits() {
        assert_eq!(parse_input("Tel Aviv\n"), Input::Edit("Tel Aviv".into()));
        assert_eq!(parse_input(""), Input::Edit(String::new()));
    }

    #[test]
    fn picks_are_one_based() {
        assert_eq!(parse_input(":1"), Input::Pick(0));
        assert_eq!(parse_input(":12"), Input::Pick(11));
        assert_eq!(parse_input(":0"), Input::Help);
    }

    #[test]
    fn commands_are_recognised() {
        assert_eq!(parse_input(":q"), Input::Quit);
        assert_eq!(parse_input(":u"), Input::ToggleUnits);
        assert_eq!(parse_input(":f"), Input::ToggleFavorite);
        assert_eq!(parse_input(":l"), Input::ListFavorites);
        assert_eq!(parse_input(":nope"), Input::Help);
    }

    #[test]
    fn imperial_flag_overrides_config() {
        let config = Config::default();
        assert_eq!(units_for(&config, true), UnitSystem::Imperial);
        assert_eq!(units_for(&config, false), UnitSystem::Metric);
    }
}
