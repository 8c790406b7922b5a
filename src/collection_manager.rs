//! Collection tree runtime component.
//!
//! This manager owns the search session for one collection view: it debounces
//! keyword edits, stamps each rebuild with a new generation, feeds the
//! incremental builder one batch per bus turn, and swaps finished trees into
//! the shared published slot.

use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::broadcast::{Receiver, Sender};

use crate::collection_search::CollectionSearch;
use crate::config::{sanitize_config, CollectionConfig, Config};
use crate::field_order::{field_order, FieldOrder};
use crate::generation::BuildGeneration;
use crate::grouping::BuildOptions;
use crate::protocol::{CollectionMessage, ConfigMessage, Message, PlaylistMessage};
use crate::scheduler::{BuildStep, BuiltTree, IncrementalBuild};
use crate::selection::{collect_selected_tracks, exclude_present, selection_uris};
use crate::track::TrackRef;
use crate::tree::NodePath;

type PublishedSlot = Arc<RwLock<Arc<BuiltTree>>>;

/// Read side of the published tree, shared with the display layer.
#[derive(Clone)]
pub struct CollectionTreeHandle {
    published: PublishedSlot,
}

impl CollectionTreeHandle {
    /// Snapshot of the currently visible tree.
    pub fn published(&self) -> Arc<BuiltTree> {
        let published = self.published.read().expect("published tree lock poisoned");
        Arc::clone(&*published)
    }

    pub fn get_selected_tracks(&self, selected: &[NodePath]) -> Vec<TrackRef> {
        collect_selected_tracks(&self.published().tree, selected)
    }

    /// Drag-and-drop URIs for the selected rows.
    pub fn selected_uris(&self, selected: &[NodePath]) -> Vec<String> {
        selection_uris(&self.get_selected_tracks(selected))
    }

    pub fn expand_hints_for_last_build(&self) -> Vec<NodePath> {
        self.published().expand_hints.clone()
    }
}

/// Coordinates keyword searches and incremental tree rebuilds.
pub struct CollectionTreeManager {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    search: Box<dyn CollectionSearch>,
    config: CollectionConfig,
    generation: BuildGeneration,
    active_build: Option<IncrementalBuild>,
    active_view: usize,
    keyword: String,
    pending_keyword: String,
    debounce_ticket: u64,
    published: PublishedSlot,
}

impl CollectionTreeManager {
    /// Creates a manager bound to bus channels and a collection search backend.
    pub fn new(
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
        search: Box<dyn CollectionSearch>,
        initial_config: Config,
    ) -> Self {
        let config = sanitize_config(initial_config).collection;
        let empty = BuiltTree::empty(config.unknown_label.clone());
        Self {
            bus_consumer,
            bus_producer,
            search,
            active_view: config.active_view,
            config,
            generation: BuildGeneration::new(),
            active_build: None,
            keyword: String::new(),
            pending_keyword: String::new(),
            debounce_ticket: 0,
            published: Arc::new(RwLock::new(Arc::new(empty))),
        }
    }

    pub fn handle(&self) -> CollectionTreeHandle {
        CollectionTreeHandle {
            published: Arc::clone(&self.published),
        }
    }

    pub fn active_view(&self) -> usize {
        self.active_view
    }

    /// Generation of the most recently started build.
    pub fn current_generation(&self) -> u64 {
        self.generation.current_id()
    }

    pub fn get_selected_tracks(&self, selected: &[NodePath]) -> Vec<TrackRef> {
        self.handle().get_selected_tracks(selected)
    }

    pub fn expand_hints_for_last_build(&self) -> Vec<NodePath> {
        self.handle().expand_hints_for_last_build()
    }

    /// Restarts the debounce timer for a new search entry value.
    pub fn on_keyword_change(&mut self, text: String) {
        self.pending_keyword = text;
        self.debounce_ticket = self.debounce_ticket.saturating_add(1);
        let ticket = self.debounce_ticket;
        let delay = Duration::from_millis(self.config.search_debounce_ms);
        let bus_producer = self.bus_producer.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = bus_producer.send(Message::Collection(
                CollectionMessage::KeywordDebounceElapsed { ticket },
            ));
        });
    }

    fn on_debounce_elapsed(&mut self, ticket: u64) {
        if ticket != self.debounce_ticket {
            debug!(
                "CollectionTreeManager: ignoring superseded debounce ticket {} (latest {})",
                ticket, self.debounce_ticket
            );
            return;
        }
        let keyword = self.pending_keyword.clone();
        self.load(keyword, self.active_view);
    }

    /// Starts a new build generation for `keyword` under the given view.
    pub fn load(&mut self, keyword: String, order_index: usize) {
        let (order_index, order) = match field_order(order_index) {
            Some(order) => (order_index, order),
            None => {
                warn!(
                    "CollectionTreeManager: unknown view index {}, using default view",
                    order_index
                );
                (0, FieldOrder::default())
            }
        };
        if order_index != self.active_view {
            self.active_view = order_index;
            let _ = self.bus_producer.send(Message::Collection(
                CollectionMessage::ActiveViewChanged(order_index),
            ));
        }
        self.keyword = keyword;

        let guard = self.generation.next();
        if let Some(previous) = self.active_build.take() {
            debug!(
                "CollectionTreeManager: dropping in-flight build generation={}",
                previous.generation()
            );
        }

        let tracks = self.search.search(&self.keyword, &order);
        if guard.is_stale() {
            return;
        }
        info!(
            "CollectionTreeManager: building generation={} keyword='{}' order={} tracks={}",
            guard.generation_id(),
            self.keyword,
            order.describe(),
            tracks.len()
        );

        let options = BuildOptions {
            use_alphabet: self.config.use_alphabet,
            unknown_label: self.config.unknown_label.clone(),
            keyword: self.keyword.clone(),
        };
        self.active_build = Some(IncrementalBuild::new(
            guard,
            tracks,
            order,
            options,
            self.config.batch_size,
        ));
        self.advance_build();
    }

    fn on_continue_build(&mut self, generation: u64) {
        let is_current = self
            .active_build
            .as_ref()
            .is_some_and(|build| build.generation() == generation);
        if is_current {
            self.advance_build();
        } else {
            debug!(
                "CollectionTreeManager: ignoring continuation for stale generation {}",
                generation
            );
        }
    }

    fn advance_build(&mut self) {
        let Some(build) = self.active_build.take() else {
            return;
        };
        match build.step() {
            BuildStep::Yield(next) => {
                let generation = next.generation();
                self.active_build = Some(next);
                let _ = self.bus_producer.send(Message::Collection(
                    CollectionMessage::ContinueBuild { generation },
                ));
            }
            BuildStep::Finished(built) => self.promote(built),
            BuildStep::Aborted { generation } => {
                debug!(
                    "CollectionTreeManager: build generation={} aborted as stale",
                    generation
                );
            }
        }
    }

    fn promote(&mut self, built: BuiltTree) {
        let generation = built.generation;
        let leaf_count = built.tree.leaf_count();
        let node_count = built.tree.len();
        let expand_hints = built.expand_hints.clone();
        {
            let mut published = self
                .published
                .write()
                .expect("published tree lock poisoned");
            *published = Arc::new(built);
        }
        info!(
            "CollectionTreeManager: published generation={} nodes={} tracks={} expand_hints={}",
            generation,
            node_count,
            leaf_count,
            expand_hints.len()
        );
        let _ = self
            .bus_producer
            .send(Message::Collection(CollectionMessage::TreePublished {
                generation,
                leaf_count,
                expand_hints,
            }));
    }

    fn append_selection_to_playlist(
        &self,
        selection: Vec<NodePath>,
        existing_locations: Vec<String>,
    ) {
        let selected = self.get_selected_tracks(&selection);
        let tracks = exclude_present(selected, &existing_locations);
        if tracks.is_empty() {
            debug!("CollectionTreeManager: selection adds no new tracks to playlist");
            return;
        }
        let _ = self
            .bus_producer
            .send(Message::Playlist(PlaylistMessage::AppendTracks(tracks)));
    }

    /// Applies one bus message.
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Config(ConfigMessage::ConfigChanged(config)) => {
                self.config = sanitize_config(config).collection;
            }
            Message::Collection(CollectionMessage::KeywordEdited(text)) => {
                self.on_keyword_change(text);
            }
            Message::Collection(CollectionMessage::SubmitSearch(text)) => {
                self.debounce_ticket = self.debounce_ticket.saturating_add(1);
                self.pending_keyword = text.clone();
                self.load(text, self.active_view);
            }
            Message::Collection(CollectionMessage::SelectOrder(order_index)) => {
                self.load(self.keyword.clone(), order_index);
            }
            Message::Collection(CollectionMessage::Load {
                keyword,
                order_index,
            }) => {
                self.load(keyword, order_index);
            }
            Message::Collection(CollectionMessage::KeywordDebounceElapsed { ticket }) => {
                self.on_debounce_elapsed(ticket);
            }
            Message::Collection(CollectionMessage::ContinueBuild { generation }) => {
                self.on_continue_build(generation);
            }
            Message::Collection(CollectionMessage::AppendSelectionToPlaylist {
                selection,
                existing_locations,
            }) => {
                self.append_selection_to_playlist(selection, existing_locations);
            }
            Message::Collection(CollectionMessage::TreePublished { .. })
            | Message::Collection(CollectionMessage::ActiveViewChanged(_))
            | Message::Playlist(_) => {}
        }
    }

    /// Missed bus traffic may include the pending `ContinueBuild`, so the
    /// in-flight build is resumed directly.
    fn on_bus_lagged(&mut self, skipped: u64) {
        warn!(
            "CollectionTreeManager lagged on control bus, skipped {} message(s)",
            skipped
        );
        if self.active_build.is_some() {
            self.advance_build();
        }
    }

    /// Starts the blocking event loop for searches and batch continuations.
    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(message) => self.handle_message(message),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    self.on_bus_lagged(skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CollectionTreeManager;
    use crate::collection_search::MemoryCollection;
    use crate::config::{CollectionConfig, Config};
    use crate::field_order::Field;
    use crate::protocol::{CollectionMessage, ConfigMessage, Message, PlaylistMessage};
    use crate::track::Track;
    use tokio::sync::broadcast::{self, error::TryRecvError, Receiver};

    fn test_collection() -> MemoryCollection {
        MemoryCollection::new(vec![
            Track::new("/beatles/1")
                .with_tag(Field::Artist, "Beatles")
                .with_tag(Field::Album, "Abbey Road")
                .with_tag(Field::Genre, "Rock")
                .with_tag(Field::Title, "Come Together")
                .into_ref(),
            Track::new("/beatles/2")
                .with_tag(Field::Artist, "Beatles")
                .with_tag(Field::Album, "Abbey Road")
                .with_tag(Field::Genre, "Rock")
                .with_tag(Field::Title, "Something")
                .into_ref(),
            Track::new("/abba/1")
                .with_tag(Field::Artist, "Abba")
                .with_tag(Field::Album, "Gold")
                .with_tag(Field::Genre, "Pop")
                .with_tag(Field::Title, "SOS")
                .into_ref(),
            Track::new("/unknown/1")
                .with_tag(Field::Album, "?")
                .with_tag(Field::Title, "X")
                .into_ref(),
            Track::new("/who/1")
                .with_tag(Field::Artist, "The Who")
                .with_tag(Field::Album, "Tommy")
                .with_tag(Field::Genre, "Rock")
                .with_tag(Field::Title, "Pinball Wizard")
                .into_ref(),
        ])
    }

    fn test_config(batch_size: usize) -> Config {
        Config {
            collection: CollectionConfig {
                batch_size,
                search_debounce_ms: 60_000,
                ..CollectionConfig::default()
            },
        }
    }

    fn test_manager(batch_size: usize) -> (CollectionTreeManager, Receiver<Message>) {
        let (bus_sender, _) = broadcast::channel(256);
        let manager = CollectionTreeManager::new(
            bus_sender.subscribe(),
            bus_sender.clone(),
            Box::new(test_collection()),
            test_config(batch_size),
        );
        let observer = bus_sender.subscribe();
        (manager, observer)
    }

    /// Feeds batch continuations back to the manager until the bus is quiet.
    fn pump(manager: &mut CollectionTreeManager, observer: &mut Receiver<Message>) -> Vec<Message> {
        let mut seen = Vec::new();
        while let Ok(message) = observer.try_recv() {
            if let Message::Collection(CollectionMessage::ContinueBuild { .. }) = &message {
                manager.handle_message(message.clone());
            }
            seen.push(message);
        }
        seen
    }

    fn published_generations(messages: &[Message]) -> Vec<u64> {
        messages
            .iter()
            .filter_map(|message| match message {
                Message::Collection(CollectionMessage::TreePublished { generation, .. }) => {
                    Some(*generation)
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_load_publishes_tree_after_all_batches() {
        let (mut manager, mut observer) = test_manager(2);
        let handle = manager.handle();

        manager.load(String::new(), 0);
        assert_eq!(
            handle.published().generation,
            0,
            "tree should not be visible before the build finishes"
        );
        let messages = pump(&mut manager, &mut observer);

        assert_eq!(published_generations(&messages), vec![1]);
        let published = handle.published();
        assert_eq!(
            published.tree.outline("Unknown"),
            vec![
                "Abba",
                "  Gold",
                "    SOS",
                "---",
                "Beatles",
                "  Abbey Road",
                "    Come Together",
                "    Something",
                "---",
                "The Who",
                "  Tommy",
                "    Pinball Wizard",
                "Unknown",
                "  ?",
                "    X",
            ]
        );
    }

    #[test]
    fn test_new_load_supersedes_in_flight_build() {
        let (mut manager, mut observer) = test_manager(1);
        let handle = manager.handle();

        manager.load(String::new(), 0);
        manager.load("abba".to_string(), 0);
        let messages = pump(&mut manager, &mut observer);

        assert_eq!(published_generations(&messages), vec![2]);
        let published = handle.published();
        assert_eq!(published.keyword, "abba");
        assert_eq!(published.tree.outline("Unknown"), vec!["Abba", "  Gold", "    SOS"]);
    }

    #[test]
    fn test_previous_tree_stays_visible_until_promotion() {
        let (mut manager, mut observer) = test_manager(1);
        let handle = manager.handle();
        manager.load(String::new(), 0);
        pump(&mut manager, &mut observer);
        assert_eq!(handle.published().generation, 1);

        manager.load("rock".to_string(), 2);

        assert_eq!(handle.published().generation, 1);
        assert_eq!(handle.published().tree.leaf_count(), 5);
        pump(&mut manager, &mut observer);
        assert_eq!(handle.published().generation, 2);
        assert_eq!(handle.published().tree.leaf_count(), 3);
    }

    #[test]
    fn test_only_latest_debounce_ticket_triggers_search() {
        let (mut manager, mut observer) = test_manager(300);
        let handle = manager.handle();

        manager.handle_message(Message::Collection(CollectionMessage::KeywordEdited(
            "ab".to_string(),
        )));
        manager.handle_message(Message::Collection(CollectionMessage::KeywordEdited(
            "abbey".to_string(),
        )));
        manager.handle_message(Message::Collection(
            CollectionMessage::KeywordDebounceElapsed { ticket: 1 },
        ));
        assert_eq!(manager.current_generation(), 0);

        manager.handle_message(Message::Collection(
            CollectionMessage::KeywordDebounceElapsed { ticket: 2 },
        ));
        pump(&mut manager, &mut observer);

        assert_eq!(manager.current_generation(), 1);
        assert_eq!(handle.published().keyword, "abbey");
        assert_eq!(handle.expand_hints_for_last_build(), vec![vec![0]]);
    }

    #[test]
    fn test_select_order_rebuilds_and_reports_view() {
        let (mut manager, mut observer) = test_manager(300);
        let handle = manager.handle();

        manager.handle_message(Message::Collection(CollectionMessage::SelectOrder(2)));
        let messages = pump(&mut manager, &mut observer);

        assert_eq!(manager.active_view(), 2);
        assert!(messages.iter().any(|message| matches!(
            message,
            Message::Collection(CollectionMessage::ActiveViewChanged(2))
        )));
        let published = handle.published();
        let top: Vec<String> = published
            .tree
            .children(published.tree.root())
            .iter()
            .filter_map(|id| published.tree.label(*id, "Unknown"))
            .collect();
        assert_eq!(top, vec!["Pop", "Rock", "Unknown"]);
        assert_eq!(published.tree.leaf_count(), 5);
    }

    #[test]
    fn test_unknown_view_index_falls_back_to_default() {
        let (mut manager, mut observer) = test_manager(300);

        manager.load(String::new(), 99);
        let messages = pump(&mut manager, &mut observer);

        assert_eq!(manager.active_view(), 0);
        assert_eq!(published_generations(&messages), vec![1]);
    }

    #[test]
    fn test_append_selection_skips_tracks_already_queued() {
        let (mut manager, mut observer) = test_manager(300);
        manager.load(String::new(), 0);
        pump(&mut manager, &mut observer);

        manager.handle_message(Message::Collection(
            CollectionMessage::AppendSelectionToPlaylist {
                selection: vec![vec![2], vec![2, 0, 1]],
                existing_locations: vec!["/beatles/1".to_string()],
            },
        ));

        let message = observer
            .try_recv()
            .expect("append request should be emitted");
        let Message::Playlist(PlaylistMessage::AppendTracks(tracks)) = message else {
            panic!("unexpected message emitted by collection tree manager");
        };
        let locations: Vec<&str> = tracks.iter().map(|track| track.location.as_str()).collect();
        assert_eq!(locations, vec!["/beatles/2"]);

        manager.handle_message(Message::Collection(
            CollectionMessage::AppendSelectionToPlaylist {
                selection: vec![vec![1]],
                existing_locations: Vec::new(),
            },
        ));
        assert!(
            observer.try_recv().is_err(),
            "selecting a separator should not emit anything"
        );
    }

    #[test]
    fn test_config_change_applies_to_next_build() {
        let (mut manager, mut observer) = test_manager(300);
        let handle = manager.handle();
        let mut config = test_config(300);
        config.collection.use_alphabet = false;
        config.collection.unknown_label = "Inconnu".to_string();

        manager.handle_message(Message::Config(ConfigMessage::ConfigChanged(config)));
        manager.load(String::new(), 0);
        pump(&mut manager, &mut observer);

        let published = handle.published();
        assert_eq!(published.unknown_label, "Inconnu");
        let outline = published.outline();
        assert!(
            !outline.iter().any(|line| line == "---"),
            "separators should be disabled"
        );
        assert_eq!(outline.len(), 13);
        assert_eq!(outline[10], "Inconnu");
    }

    #[test]
    fn test_build_resumes_after_bus_lag_drops_continuation() {
        let (bus_sender, _) = broadcast::channel(4);
        let mut manager = CollectionTreeManager::new(
            bus_sender.subscribe(),
            bus_sender.clone(),
            Box::new(test_collection()),
            test_config(1),
        );
        let handle = manager.handle();

        manager.load(String::new(), 0);
        for _ in 0..6 {
            bus_sender
                .send(Message::Playlist(PlaylistMessage::AppendTracks(Vec::new())))
                .expect("bus should have a receiver");
        }

        let mut lagged = false;
        loop {
            match manager.bus_consumer.try_recv() {
                Ok(message) => manager.handle_message(message),
                Err(TryRecvError::Lagged(skipped)) => {
                    lagged = true;
                    manager.on_bus_lagged(skipped);
                }
                Err(_) => break,
            }
        }

        assert!(lagged, "consumer should have lagged behind the small bus");
        assert!(manager.active_build.is_none());
        assert_eq!(handle.published().generation, 1);
        assert_eq!(handle.published().tree.leaf_count(), 5);
    }

    #[test]
    fn test_handle_resolves_selection_uris() {
        let (mut manager, mut observer) = test_manager(300);
        let handle = manager.handle();
        manager.load("who".to_string(), 0);
        pump(&mut manager, &mut observer);

        assert_eq!(handle.selected_uris(&[vec![0]]), vec!["/who/1"]);
        assert_eq!(manager.get_selected_tracks(&[vec![0, 0, 0]]).len(), 1);
    }
}
