//! Command handlers: request → reply transformations.
//!
//! Handlers never fail: every outcome, including storage or rendering faults,
//! becomes a [`Reply`] for the messenger adapter to deliver.

use std::{path::PathBuf, sync::Arc, time::Duration};

use tracing::{debug, error, info};

use crate::{
    config::Config,
    domain::{ChatId, MapPoint},
    errors::Error,
    formatting::escape_html,
    geocode::Geocoder,
    messaging::types::CommandInfo,
    render::{MapRenderer, MapStyle, RenderedMap},
    store::CityStore,
    Result,
};

/// Commands advertised in the Telegram UI, in display order.
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        command: "start",
        description: "Start the bot",
    },
    CommandInfo {
        command: "help",
        description: "Show the list of commands",
    },
    CommandInfo {
        command: "show_city",
        description: "Show a city on the map",
    },
    CommandInfo {
        command: "remember_city",
        description: "Save a city to your favorites",
    },
    CommandInfo {
        command: "show_my_cities",
        description: "Show all your saved cities on the map",
    },
];

const GENERIC_FAILURE: &str =
    "Something went wrong while handling your request. Please try again later.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Argument is trimmed; empty when the user gave none.
    ShowCity(String),
    RememberCity(String),
    ShowMyCities,
    Unknown(String),
}

impl Command {
    /// Parse `/cmd[@botname] [args]`. Returns `None` for non-command text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let mut parts = text.splitn(2, char::is_whitespace);
        let first = parts.next().unwrap_or("");
        let arg = parts.next().unwrap_or("").trim().to_string();

        let name = first
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or("")
            .to_lowercase();

        Some(match name.as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "show_city" => Self::ShowCity(arg),
            "remember_city" => Self::RememberCity(arg),
            "show_my_cities" => Self::ShowMyCities,
            _ => Self::Unknown(name),
        })
    }

    /// Short name used in logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::ShowCity(_) => "show_city",
            Self::RememberCity(_) => "remember_city",
            Self::ShowMyCities => "show_my_cities",
            Self::Unknown(name) => name.as_str(),
        }
    }
}

/// What the messenger should send back.
#[derive(Debug)]
pub enum Reply {
    /// Telegram-HTML text.
    Text(String),
    /// A map image; the file is deleted once the reply is dropped.
    Photo(RenderedMap),
}

impl Reply {
    fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

#[derive(Clone, Debug)]
pub struct BotSettings {
    pub temp_dir: PathBuf,
    pub geocode_timeout: Duration,
    pub map_size: (u32, u32),
    pub multi_map_size: (u32, u32),
}

impl BotSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            temp_dir: cfg.temp_dir.clone(),
            geocode_timeout: cfg.geocode_timeout,
            map_size: cfg.map_size,
            multi_map_size: cfg.multi_map_size,
        }
    }
}

/// Command handlers with their collaborators injected once at startup.
pub struct MapBot {
    store: Arc<dyn CityStore>,
    geocoder: Arc<dyn Geocoder>,
    renderer: Arc<dyn MapRenderer>,
    settings: BotSettings,
}

impl MapBot {
    pub fn new(
        store: Arc<dyn CityStore>,
        geocoder: Arc<dyn Geocoder>,
        renderer: Arc<dyn MapRenderer>,
        settings: BotSettings,
    ) -> Self {
        Self {
            store,
            geocoder,
            renderer,
            settings,
        }
    }

    pub async fn handle(&self, chat_id: ChatId, command: &Command) -> Reply {
        debug!(chat_id = chat_id.0, command = command.name(), "handling command");
        match command {
            Command::Start => self.start(),
            Command::Help => self.help(),
            Command::ShowCity(name) => self.show_city(chat_id, name).await,
            Command::RememberCity(name) => self.remember_city(chat_id, name).await,
            Command::ShowMyCities => self.show_my_cities(chat_id).await,
            Command::Unknown(name) => Reply::Text(format!(
                "Unknown command: /{}\nSend /help to see what I can do.",
                escape_html(name)
            )),
        }
    }

    pub fn start(&self) -> Reply {
        Reply::text("Hi! I'm a map bot.\nSend /help to see what I can do.")
    }

    pub fn help(&self) -> Reply {
        let mut lines = vec!["<b>Available commands:</b>".to_string()];
        for c in COMMANDS {
            let usage = match c.command {
                "show_city" | "remember_city" => " &lt;city_name&gt;",
                _ => "",
            };
            lines.push(format!("/{}{usage} - {}", c.command, c.description));
        }
        Reply::Text(lines.join("\n"))
    }

    pub async fn show_city(&self, chat_id: ChatId, name: &str) -> Reply {
        let name = name.trim();
        if name.is_empty() {
            return Reply::text("Usage: /show_city &lt;city_name&gt;");
        }

        let Some(coords) = self
            .geocoder
            .geocode(name, self.settings.geocode_timeout)
            .await
        else {
            return Reply::Text(format!(
                "Could not find coordinates for the city «{}».",
                escape_html(name)
            ));
        };

        let out = self
            .settings
            .temp_dir
            .join(format!("temp_{}_city.png", chat_id.0));
        self.render_reply(
            format!("City: {name}"),
            vec![MapPoint::new(name, coords)],
            MapStyle::single(self.settings.map_size),
            out,
        )
        .await
    }

    pub async fn remember_city(&self, chat_id: ChatId, name: &str) -> Reply {
        let name = name.trim();
        if name.is_empty() {
            return Reply::text("Usage: /remember_city &lt;city_name&gt;");
        }

        // Only cities the geocoder knows about may be saved.
        if self
            .geocoder
            .geocode(name, self.settings.geocode_timeout)
            .await
            .is_none()
        {
            return Reply::Text(format!(
                "The city «{}» was not found by the geocoder.",
                escape_html(name)
            ));
        }

        let city = name.to_string();
        match self
            .with_store(move |store| store.add_city(chat_id, &city))
            .await
        {
            Ok(true) => {
                info!(chat_id = chat_id.0, city = name, "city saved");
                Reply::Text(format!(
                    "The city «{}» has been saved!",
                    escape_html(name)
                ))
            }
            Ok(false) => {
                Reply::text("Could not save the city. It may already be in your list.")
            }
            Err(e) => failure(chat_id, "remember_city", &e),
        }
    }

    pub async fn show_my_cities(&self, chat_id: ChatId) -> Reply {
        let cities = match self
            .with_store(move |store| store.select_cities(chat_id))
            .await
        {
            Ok(c) => c,
            Err(e) => return failure(chat_id, "show_my_cities", &e),
        };
        if cities.is_empty() {
            return Reply::text("You have no saved cities yet.");
        }

        // Cities the geocoder cannot resolve are left off the map.
        let mut points = Vec::with_capacity(cities.len());
        for city in cities {
            match self
                .geocoder
                .geocode(&city, self.settings.geocode_timeout)
                .await
            {
                Some(coords) => points.push(MapPoint::new(city, coords)),
                None => debug!(chat_id = chat_id.0, city = %city, "skipping unresolved city"),
            }
        }

        if points.is_empty() {
            return Reply::text("Could not get coordinates for your cities.");
        }

        let out = self
            .settings
            .temp_dir
            .join(format!("temp_{}_cities.png", chat_id.0));
        self.render_reply(
            "My saved cities".to_string(),
            points,
            MapStyle::multi(self.settings.multi_map_size),
            out,
        )
        .await
    }

    /// Run a store call on the blocking pool; rusqlite calls block.
    async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CityStore) -> Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .unwrap_or_else(|e| Err(Error::External(format!("store task failed: {e}"))))
    }

    async fn render_reply(
        &self,
        title: String,
        points: Vec<MapPoint>,
        style: MapStyle,
        out: PathBuf,
    ) -> Reply {
        let renderer = self.renderer.clone();
        let map = RenderedMap::new(out);
        let path = map.path().to_path_buf();

        let rendered: Result<()> = tokio::task::spawn_blocking(move || {
            renderer.render(&title, &points, style, &path)
        })
        .await
        .unwrap_or_else(|e| Err(Error::Render(format!("render task failed: {e}"))));

        match rendered {
            Ok(()) => Reply::Photo(map),
            // `map` is dropped here, removing any partial file.
            Err(e) => {
                error!(path = %map.path().display(), "map render failed: {e}");
                Reply::text(GENERIC_FAILURE)
            }
        }
    }
}

fn failure(chat_id: ChatId, op: &str, e: &Error) -> Reply {
    error!(chat_id = chat_id.0, op, "request failed: {e}");
    Reply::text(GENERIC_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Coordinates, store::SqliteCityStore};
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        path::Path,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    #[derive(Default)]
    struct FakeGeocoder {
        known: HashMap<String, Coordinates>,
        calls: AtomicUsize,
    }

    impl FakeGeocoder {
        fn with(cities: &[(&str, f64, f64)]) -> Self {
            Self {
                known: cities
                    .iter()
                    .map(|(n, lat, lon)| (n.to_string(), Coordinates::new(*lat, *lon)))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, name: &str, _timeout: Duration) -> Option<Coordinates> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.known.get(name).copied()
        }
    }

    #[derive(Default)]
    struct FakeRenderer {
        fail: bool,
        renders: Mutex<Vec<(String, Vec<MapPoint>)>>,
    }

    impl MapRenderer for FakeRenderer {
        fn render(
            &self,
            title: &str,
            points: &[MapPoint],
            _style: MapStyle,
            out: &Path,
        ) -> Result<()> {
            std::fs::write(out, b"png")?;
            if self.fail {
                return Err(Error::Render("boom".to_string()));
            }
            self.renders
                .lock()
                .unwrap()
                .push((title.to_string(), points.to_vec()));
            Ok(())
        }
    }

    struct BrokenStore;

    impl CityStore for BrokenStore {
        fn add_city(&self, _user_id: ChatId, _city_name: &str) -> Result<bool> {
            Err(Error::External("database is locked".to_string()))
        }

        fn select_cities(&self, _user_id: ChatId) -> Result<Vec<String>> {
            Err(Error::External("database is locked".to_string()))
        }
    }

    struct Harness {
        bot: MapBot,
        store: Arc<SqliteCityStore>,
        geocoder: Arc<FakeGeocoder>,
        renderer: Arc<FakeRenderer>,
        dir: tempfile::TempDir,
    }

    fn settings(dir: &Path) -> BotSettings {
        BotSettings {
            temp_dir: dir.to_path_buf(),
            geocode_timeout: Duration::from_secs(10),
            map_size: (800, 600),
            multi_map_size: (1000, 800),
        }
    }

    fn harness_with(geocoder: FakeGeocoder, renderer: FakeRenderer) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteCityStore::open_in_memory().unwrap());
        let geocoder = Arc::new(geocoder);
        let renderer = Arc::new(renderer);
        let bot = MapBot::new(
            store.clone(),
            geocoder.clone(),
            renderer.clone(),
            settings(dir.path()),
        );
        Harness {
            bot,
            store,
            geocoder,
            renderer,
            dir,
        }
    }

    fn harness() -> Harness {
        harness_with(
            FakeGeocoder::with(&[
                ("Paris", 48.85, 2.35),
                ("Tokyo", 35.68, 139.69),
                ("Rock & Roll", 1.0, 1.0),
            ]),
            FakeRenderer::default(),
        )
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(t) => t,
            Reply::Photo(m) => panic!("expected text, got photo at {}", m.path().display()),
        }
    }

    #[test]
    fn parses_commands_with_bot_suffix_and_arguments() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/HELP@map_bot"), Some(Command::Help));
        assert_eq!(
            Command::parse("/show_city   New York  "),
            Some(Command::ShowCity("New York".to_string()))
        );
        assert_eq!(
            Command::parse("/remember_city@map_bot Paris"),
            Some(Command::RememberCity("Paris".to_string()))
        );
        assert_eq!(
            Command::parse("/show_city"),
            Some(Command::ShowCity(String::new()))
        );
        assert_eq!(
            Command::parse("/show_my_cities"),
            Some(Command::ShowMyCities)
        );
        assert_eq!(
            Command::parse("/weather Paris"),
            Some(Command::Unknown("weather".to_string()))
        );
        assert_eq!(Command::parse("hello"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let h = harness();
        let body = text(h.bot.help());
        for c in COMMANDS {
            assert!(body.contains(&format!("/{}", c.command)), "{body}");
        }
    }

    #[tokio::test]
    async fn show_city_without_argument_is_a_usage_hint() {
        let h = harness();
        let reply = h.bot.handle(ChatId(1), &Command::ShowCity(String::new())).await;
        assert!(text(reply).starts_with("Usage: /show_city"));
        assert_eq!(h.geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn show_city_renders_a_single_point() {
        let h = harness();
        let reply = h.bot.show_city(ChatId(5), "Paris").await;
        let Reply::Photo(map) = reply else {
            panic!("expected a photo");
        };
        assert_eq!(map.path(), h.dir.path().join("temp_5_city.png"));
        assert!(map.path().exists());

        let renders = h.renderer.renders.lock().unwrap().clone();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].0, "City: Paris");
        assert_eq!(
            renders[0].1,
            vec![MapPoint::new("Paris", Coordinates::new(48.85, 2.35))]
        );

        let path = map.path().to_path_buf();
        drop(map);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn show_city_reports_unknown_city() {
        let h = harness();
        let body = text(h.bot.show_city(ChatId(1), "Atlantis").await);
        assert!(body.contains("Could not find coordinates"));
        assert!(body.contains("Atlantis"));
    }

    #[tokio::test]
    async fn render_failure_becomes_generic_text_and_cleans_up() {
        let h = harness_with(
            FakeGeocoder::with(&[("Paris", 48.85, 2.35)]),
            FakeRenderer {
                fail: true,
                ..Default::default()
            },
        );
        let body = text(h.bot.show_city(ChatId(9), "Paris").await);
        assert_eq!(body, GENERIC_FAILURE);
        assert!(!h.dir.path().join("temp_9_city.png").exists());
    }

    #[tokio::test]
    async fn remember_city_saves_then_reports_duplicate() {
        let h = harness();
        let first = text(h.bot.remember_city(ChatId(42), "Paris").await);
        assert!(first.contains("has been saved"));

        let second = text(h.bot.remember_city(ChatId(42), "Paris").await);
        assert_eq!(
            second,
            "Could not save the city. It may already be in your list."
        );

        assert_eq!(h.store.select_cities(ChatId(42)).unwrap(), vec!["Paris"]);
    }

    #[tokio::test]
    async fn remember_city_never_stores_unresolvable_names() {
        let h = harness();
        let body = text(h.bot.remember_city(ChatId(42), "Atlantis").await);
        assert!(body.contains("not found by the geocoder"));
        assert!(h.store.select_cities(ChatId(42)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn remember_city_without_argument_is_a_usage_hint() {
        let h = harness();
        let body = text(h.bot.handle(ChatId(1), &Command::RememberCity("  ".into())).await);
        assert!(body.starts_with("Usage: /remember_city"));
        assert_eq!(h.geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn replies_escape_city_names() {
        let h = harness();
        let body = text(h.bot.remember_city(ChatId(3), "Rock & Roll").await);
        assert!(body.contains("Rock &amp; Roll"));
        // Stored as entered, not escaped.
        assert_eq!(h.store.select_cities(ChatId(3)).unwrap(), vec!["Rock & Roll"]);
    }

    #[tokio::test]
    async fn show_my_cities_with_nothing_saved() {
        let h = harness();
        let body = text(h.bot.show_my_cities(ChatId(1)).await);
        assert_eq!(body, "You have no saved cities yet.");
    }

    #[tokio::test]
    async fn show_my_cities_drops_unresolvable_cities() {
        let h = harness();
        h.store.add_city(ChatId(7), "Paris").unwrap();
        h.store.add_city(ChatId(7), "Atlantis").unwrap();
        h.store.add_city(ChatId(7), "Tokyo").unwrap();

        let reply = h.bot.show_my_cities(ChatId(7)).await;
        assert!(matches!(reply, Reply::Photo(_)));

        let renders = h.renderer.renders.lock().unwrap().clone();
        assert_eq!(renders[0].0, "My saved cities");
        let labels: Vec<&str> = renders[0].1.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Paris", "Tokyo"]);
    }

    #[tokio::test]
    async fn show_my_cities_when_nothing_resolves() {
        let h = harness();
        h.store.add_city(ChatId(7), "Atlantis").unwrap();
        let body = text(h.bot.show_my_cities(ChatId(7)).await);
        assert_eq!(body, "Could not get coordinates for your cities.");
        assert!(h.renderer.renders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_faults_become_generic_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bot = MapBot::new(
            Arc::new(BrokenStore),
            Arc::new(FakeGeocoder::with(&[("Paris", 48.85, 2.35)])),
            Arc::new(FakeRenderer::default()),
            settings(dir.path()),
        );

        assert_eq!(text(bot.remember_city(ChatId(1), "Paris").await), GENERIC_FAILURE);
        assert_eq!(text(bot.show_my_cities(ChatId(1)).await), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn unknown_command_points_to_help() {
        let h = harness();
        let body = text(h.bot.handle(ChatId(1), &Command::Unknown("<x>".into())).await);
        assert!(body.contains("/&lt;x&gt;"));
        assert!(body.contains("/help"));
    }
}
