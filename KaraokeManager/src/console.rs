//! Console interactive : pilote la file karaoké depuis le terminal.
//!
//! Les lignes de stdin arrivent par un canal alimenté par un thread dédié.
//! La console joue aussi le rôle du collaborateur de confirmation lors du
//! passage à la chanson suivante.

use async_trait::async_trait;
use karaplaylist::{
    ConfirmRemoval, Countdown, CountdownOutcome, CurrentSelection, Error, RemovalDecision,
    SharedEngine, SongRequest, is_valid_link,
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  list          show the playlist
  add           add a song
  edit <i>      edit the song at position i
  delete <i>    delete the song at position i
  up <i>        move the song at position i up
  down <i>      move the song at position i down
  next          play the next song (after the countdown)
  stop          cancel a running countdown
  current       show the song being played
  help          show this help
  quit          stop the karaoke manager";

/// Lance un thread qui lit stdin ligne par ligne.
///
/// Le canal se ferme à la fin de l'entrée standard.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Entrées/sorties partagées entre la boucle de commandes et les questions
/// posées pendant un `advance`.
pub struct ConsoleIo<W> {
    input: Mutex<mpsc::UnboundedReceiver<String>>,
    output: std::sync::Mutex<W>,
}

impl<W: Write + Send> ConsoleIo<W> {
    pub fn new(input: mpsc::UnboundedReceiver<String>, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: std::sync::Mutex::new(output),
        }
    }

    fn write(&self, text: &str, newline: bool) {
        let mut out = match self.output.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        let written = if newline {
            writeln!(out, "{}", text)
        } else {
            write!(out, "{}", text)
        };
        if let Err(e) = written.and_then(|_| out.flush()) {
            warn!("Console write failed: {}", e);
        }
    }

    pub fn say(&self, text: &str) {
        self.write(text, true);
    }

    /// Prochaine ligne saisie, `None` en fin d'entrée
    pub async fn read_line(&self) -> Option<String> {
        self.input.lock().await.recv().await
    }

    /// Affiche `prompt` et attend la réponse
    pub async fn ask(&self, prompt: &str) -> Option<String> {
        self.write(prompt, false);
        self.read_line().await.map(|line| line.trim().to_string())
    }

    /// Question oui/non, non par défaut
    pub async fn confirm(&self, question: &str) -> bool {
        matches!(
            self.ask(&format!("{} [y/N] ", question))
                .await
                .as_deref()
                .map(str::to_lowercase)
                .as_deref(),
            Some("y") | Some("yes")
        )
    }
}

#[async_trait]
impl<W: Write + Send> ConfirmRemoval for ConsoleIo<W> {
    async fn confirm_removal(&self, song: &SongRequest) -> RemovalDecision {
        if self
            .confirm(&format!("Remove current song \"{}\"?", song.name))
            .await
        {
            RemovalDecision::Remove
        } else {
            RemovalDecision::Requeue
        }
    }
}

/// Boucle de commandes
pub struct Console<W> {
    engine: SharedEngine,
    io: Arc<ConsoleIo<W>>,
    countdown_secs: u64,
}

/// Suite à donner après une commande
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

impl<W: Write + Send + 'static> Console<W> {
    pub fn new(
        engine: SharedEngine,
        input: mpsc::UnboundedReceiver<String>,
        output: W,
        countdown_secs: u64,
    ) -> Self {
        Self {
            engine,
            io: Arc::new(ConsoleIo::new(input, output)),
            countdown_secs,
        }
    }

    /// Lit et exécute les commandes jusqu'à `quit` ou la fin de l'entrée
    pub async fn run(&self) {
        self.io.say("Karaoke Manager ready. Type 'help' for the list of commands.");

        loop {
            self.io.write("> ", false);
            let Some(line) = self.io.read_line().await else {
                debug!("Console input closed");
                break;
            };

            if self.execute(line.trim()).await == Flow::Quit {
                break;
            }
        }
    }

    async fn execute(&self, line: &str) -> Flow {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Flow::Continue;
        };
        let argument = words.next();

        match command.to_lowercase().as_str() {
            "list" | "ls" => self.list().await,
            "add" => self.add().await,
            "edit" => self.with_index(argument, |i| self.edit(i)).await,
            "delete" | "del" => self.with_index(argument, |i| self.delete(i)).await,
            "up" => {
                self.with_index(argument, |i| async move {
                    let result = self.engine.lock().await.move_up(i);
                    self.report(result.map(|_| "Moved up."));
                })
                .await
            }
            "down" => {
                self.with_index(argument, |i| async move {
                    let result = self.engine.lock().await.move_down(i);
                    self.report(result.map(|_| "Moved down."));
                })
                .await
            }
            "next" | "n" => self.next().await,
            "stop" => self.io.say("No countdown running."),
            "current" => self.current().await,
            "help" | "?" => self.io.say(HELP),
            "quit" | "exit" => {
                if self
                    .io
                    .confirm("Do you really want to quit? (This will also stop the webserver)")
                    .await
                {
                    return Flow::Quit;
                }
            }
            other => self
                .io
                .say(&format!("Unknown command '{}'. Type 'help'.", other)),
        }

        Flow::Continue
    }

    async fn with_index<F, Fut>(&self, argument: Option<&str>, action: F)
    where
        F: FnOnce(usize) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        match argument.map(str::parse::<usize>) {
            Some(Ok(index)) => action(index).await,
            _ => self.io.say("Expected a song position, e.g. 'edit 2'."),
        }
    }

    fn report(&self, result: karaplaylist::Result<&str>) {
        match result {
            Ok(message) => self.io.say(message),
            Err(Error::Store(e)) => {
                warn!("Playlist not saved: {}", e);
                self.io
                    .say(&format!("Change applied but the playlist could not be saved: {}", e));
            }
            Err(e) => self.io.say(&e.to_string()),
        }
    }

    async fn list(&self) {
        let engine = self.engine.lock().await;
        if engine.is_empty() {
            self.io.say("Playlist is empty.");
            return;
        }

        let current = engine.current_index();
        for (index, song) in engine.playlist().iter().enumerate() {
            let marker = if Some(index) == current { '*' } else { ' ' };
            self.io.say(&format!("{} {:>3}  {}", marker, index, song));
        }
    }

    /// Saisit les quatre champs ; une réponse vide garde la valeur proposée.
    ///
    /// Un lien invalide est redemandé seul, les autres champs sont conservés.
    async fn read_song(&self, initial: Option<&SongRequest>) -> Option<SongRequest> {
        let mut fields = Vec::with_capacity(4);
        let defaults = initial.map(|s| [&s.person, &s.name, &s.author, &s.link]);

        for (i, label) in ["Singer", "Song name", "Author", "YouTube link"]
            .iter()
            .enumerate()
        {
            let prompt = match defaults {
                Some(values) => format!("{} [{}]: ", label, values[i]),
                None => format!("{}: ", label),
            };
            let value = loop {
                let answer = self.io.ask(&prompt).await?;
                let value = match (answer.is_empty(), defaults) {
                    (true, Some(values)) => values[i].clone(),
                    _ => answer,
                };
                if i < 3 || is_valid_link(&value) {
                    break value;
                }
                self.io.say(&Error::InvalidLink(value).to_string());
            };
            fields.push(value);
        }

        let [person, name, author, link]: [String; 4] = fields.try_into().ok()?;
        Some(SongRequest::new(person, name, author, link))
    }

    async fn add(&self) {
        let Some(song) = self.read_song(None).await else {
            return;
        };
        let result = self.engine.lock().await.add(song);
        self.report(result.map(|_| "Song added."));
    }

    async fn edit(&self, index: usize) {
        let existing = self.engine.lock().await.playlist().get(index).cloned();
        let Some(existing) = existing else {
            let len = self.engine.lock().await.len();
            self.report(Err(Error::IndexOutOfRange { index, len }));
            return;
        };

        let Some(song) = self.read_song(Some(&existing)).await else {
            return;
        };
        let result = self.engine.lock().await.edit(index, song);
        self.report(result.map(|_| "Song updated."));
    }

    async fn delete(&self, index: usize) {
        let existing = self.engine.lock().await.playlist().get(index).cloned();
        let Some(existing) = existing else {
            let len = self.engine.lock().await.len();
            self.report(Err(Error::IndexOutOfRange { index, len }));
            return;
        };

        if !self
            .io
            .confirm(&format!("Delete \"{}\" sung by {}?", existing.name, existing.person))
            .await
        {
            return;
        }

        let result = self.engine.lock().await.delete(index);
        self.report(result.map(|_| "Song deleted."));
    }

    /// Compte à rebours (annulable par `stop`) puis passage à la suivante
    async fn next(&self) {
        if self.engine.lock().await.is_empty() {
            self.report(Err(Error::EmptyPlaylist));
            return;
        }

        if self.countdown_secs > 0 && self.countdown().await == CountdownOutcome::Cancelled {
            self.io.say("Countdown stopped.");
            return;
        }

        let mut engine = self.engine.lock().await;
        match engine.advance(self.io.as_ref()).await {
            Ok(Some(selection)) => self.io.say(&now_playing(&selection)),
            Ok(None) => self.io.say("Playlist is now empty."),
            Err(e) => self.report(Err(e)),
        }
    }

    async fn countdown(&self) -> CountdownOutcome {
        let mut countdown = Countdown::seconds(self.countdown_secs);
        self.io.say("Next song starting, type 'stop' to cancel.");

        loop {
            tokio::select! {
                tick = countdown.tick() => match tick {
                    Some(remaining) => self.io.say(&format!("{}...", remaining)),
                    None => break,
                },
                line = self.io.read_line() => match line.as_deref().map(str::trim) {
                    Some("stop") | None => {
                        countdown.cancel();
                        break;
                    }
                    Some(_) => self.io.say("Countdown running, type 'stop' to cancel."),
                },
            }
        }

        countdown.finished().await
    }

    async fn current(&self) {
        match self.engine.lock().await.current_selection() {
            Some(selection) => self.io.say(&now_playing(&selection)),
            None => self.io.say("Nothing is playing."),
        }
    }
}

fn now_playing(selection: &CurrentSelection) -> String {
    format!(
        "Now Playing: \"{}\" by \"{}\" (Singer: {})\nStarted at: {}",
        selection.song.name,
        selection.song.author,
        selection.song.person,
        selection.started_at_display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use karaplaylist::{HubOptions, NotificationHub, PlaylistEngine, SongStore};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MemoryStore;

    impl SongStore for MemoryStore {
        fn load(&self) -> karaplaylist::Result<Vec<SongRequest>> {
            Ok(Vec::new())
        }

        fn save(&self, _songs: &[SongRequest]) -> karaplaylist::Result<()> {
            Ok(())
        }
    }

    /// Sortie partagée pour inspecter ce que la console affiche
    #[derive(Clone, Default)]
    struct SharedOutput(Arc<StdMutex<Vec<u8>>>);

    impl SharedOutput {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn song(person: &str, id: &str) -> SongRequest {
        SongRequest::new(
            person,
            format!("Song {}", id),
            "Artist",
            format!("https://www.youtube.com/watch?v={}", id),
        )
    }

    /// Exécute la console sur un script de lignes
    async fn run_script(
        songs: Vec<SongRequest>,
        countdown_secs: u64,
        lines: &[&str],
    ) -> (SharedEngine, Arc<NotificationHub>, String) {
        let hub = Arc::new(NotificationHub::new(HubOptions::default()));
        let mut engine =
            PlaylistEngine::open(Arc::new(MemoryStore), hub.clone(), "autoplay=1").unwrap();
        for s in songs {
            engine.add(s).unwrap();
        }
        let engine = engine.shared();

        let (tx, rx) = mpsc::unbounded_channel();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        drop(tx);

        let output = SharedOutput::default();
        let console = Console::new(engine.clone(), rx, output.clone(), countdown_secs);
        console.run().await;
        (engine, hub, output.text())
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (engine, _hub, out) = run_script(
            Vec::new(),
            0,
            &[
                "add",
                "Ann",
                "Dancing Queen",
                "ABBA",
                "https://www.youtube.com/watch?v=xFrGuyw1V8s",
                "list",
            ],
        )
        .await;

        assert_eq!(engine.lock().await.len(), 1);
        assert!(out.contains("Song added."));
        assert!(out.contains("Singer: Ann | \"Dancing Queen\" by ABBA"));
    }

    #[tokio::test]
    async fn test_add_invalid_link() {
        let (engine, _hub, out) =
            run_script(Vec::new(), 0, &["add", "Ann", "Song", "Artist", "not a link"]).await;

        assert!(engine.lock().await.is_empty());
        assert!(out.contains("Invalid video link: not a link"));
    }

    #[tokio::test]
    async fn test_invalid_link_asks_again_for_link_only() {
        let (engine, _hub, out) = run_script(
            Vec::new(),
            0,
            &[
                "add",
                "Ann",
                "Song",
                "Artist",
                "not a link",
                "https://youtu.be/aaa",
            ],
        )
        .await;

        assert!(out.contains("Invalid video link: not a link"));
        assert_eq!(out.matches("Singer: ").count(), 1);
        assert_eq!(out.matches("YouTube link: ").count(), 2);
        assert_eq!(
            engine.lock().await.playlist(),
            vec![SongRequest::new("Ann", "Song", "Artist", "https://youtu.be/aaa")]
        );
    }

    #[tokio::test]
    async fn test_edit_keeps_empty_fields() {
        let (engine, _hub, _out) =
            run_script(vec![song("Ann", "aaa")], 0, &["edit 0", "Bob", "", "", ""]).await;

        let playlist = engine.lock().await.playlist();
        assert_eq!(playlist[0].person, "Bob");
        assert_eq!(playlist[0].name, "Song aaa");
    }

    #[tokio::test]
    async fn test_delete_asks_for_confirmation() {
        let (engine, _hub, out) = run_script(
            vec![song("Ann", "aaa"), song("Bob", "bbb")],
            0,
            &["delete 0", "n", "delete 1", "y", "delete 7"],
        )
        .await;

        assert_eq!(engine.lock().await.playlist(), vec![song("Ann", "aaa")]);
        assert!(out.contains("Song deleted."));
        assert!(out.contains("Index 7 out of range"));
    }

    #[tokio::test]
    async fn test_next_prompts_for_removal() {
        let (engine, hub, out) = run_script(
            vec![song("Ann", "aaa"), song("Bob", "bbb")],
            0,
            &["next", "next", "y", "current"],
        )
        .await;

        let engine = engine.lock().await;
        assert_eq!(engine.playlist(), vec![song("Bob", "bbb")]);
        assert_eq!(engine.current_selection().unwrap().song, song("Bob", "bbb"));
        assert_eq!(hub.last_published(), "https://www.youtube.com/embed/bbb?autoplay=1");
        assert!(out.contains("Remove current song \"Song aaa\"? [y/N]"));
        assert!(out.contains("Now Playing: \"Song bbb\" by \"Artist\" (Singer: Bob)"));
    }

    #[tokio::test]
    async fn test_next_on_empty_playlist() {
        let (_engine, _hub, out) = run_script(Vec::new(), 0, &["next"]).await;
        assert!(out.contains("No songs in the playlist"));
    }

    #[tokio::test]
    async fn test_stop_cancels_countdown() {
        let (engine, hub, out) =
            run_script(vec![song("Ann", "aaa")], 30, &["next", "stop"]).await;

        assert_eq!(engine.lock().await.current_selection(), None);
        assert_eq!(hub.last_published(), "");
        assert!(out.contains("Countdown stopped."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_elapses_then_advances() {
        let hub = Arc::new(NotificationHub::new(HubOptions::default()));
        let mut engine =
            PlaylistEngine::open(Arc::new(MemoryStore), hub.clone(), "autoplay=1").unwrap();
        engine.add(song("Ann", "aaa")).unwrap();
        let engine = engine.shared();

        // Le canal reste ouvert pendant le compte à rebours
        let (tx, rx) = mpsc::unbounded_channel();
        let output = SharedOutput::default();
        let console = Console::new(engine.clone(), rx, output.clone(), 3);

        tx.send("next".to_string()).unwrap();
        let run = tokio::spawn(async move { console.run().await });

        let mut viewer = hub.subscribe();
        assert_eq!(
            viewer.recv().await.as_deref(),
            Some("https://www.youtube.com/embed/aaa?autoplay=1")
        );

        drop(tx);
        run.await.unwrap();
        let out = output.text();
        assert!(out.contains("3..."));
        assert!(out.contains("1..."));
    }

    #[tokio::test]
    async fn test_quit_requires_confirmation() {
        let (_engine, _hub, out) =
            run_script(Vec::new(), 0, &["quit", "n", "help", "quit", "y", "list"]).await;

        assert!(out.contains("Commands:"));
        // Rien n'est exécuté après la confirmation
        assert!(!out.contains("Playlist is empty."));
    }
}
