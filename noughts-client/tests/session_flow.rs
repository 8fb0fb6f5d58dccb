//! End-to-end flow against an in-process server on a loopback socket.

use std::sync::{Arc, Mutex};

use noughts_client::mock::RecordingPresenter;
use noughts_client::{
    Board, DisconnectReason, EventDispatcher, GameEntry, GameLaunch, GameSession, LobbySession,
    MatchOutcome, MatchPhase, Position, Presenter, SessionHandle,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;

/// Lobby-side presenter that opens the game screen the way a UI would: the
/// game consumer is attached immediately, readiness is signalled later.
struct Screens {
    board: Arc<RecordingPresenter>,
    game: Mutex<Option<Arc<GameSession>>>,
    outcomes: Arc<Mutex<Vec<MatchOutcome>>>,
}

impl Screens {
    fn game(&self) -> Arc<GameSession> {
        self.game.lock().unwrap().clone().expect("game screen opened")
    }
}

impl Presenter for Screens {
    fn show_prompt(&self, _text: &str) {}
    fn set_cell_enabled(&self, _position: Position, _enabled: bool) {}
    fn set_board_enabled(&self, _enabled: bool) {}
    fn render_board(&self, _board: &Board) {}
    fn show_message(&self, _title: &str, _body: &str) {}
    fn show_games(&self, _games: &[GameEntry]) {}

    fn navigate_to_game(&self, session: SessionHandle, launch: GameLaunch) {
        let outcomes = self.outcomes.clone();
        let game = Arc::new(GameSession::new(
            launch,
            self.board.clone(),
            Arc::new(session.clone()),
            move |outcome| outcomes.lock().unwrap().push(outcome),
        ));
        session.set_listener(&game);
        *self.game.lock().unwrap() = Some(game);
    }
}

struct Server {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Server {
    async fn say(&mut self, lines: &str) {
        self.writer.write_all(lines.as_bytes()).await.unwrap();
    }

    async fn hear(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line.trim_end().to_string()
    }
}

async fn connect() -> (SessionHandle, EventDispatcher, Server) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

    let (session, dispatcher) = SessionHandle::connect(&addr).await.unwrap();
    let (read, write) = accept.await.unwrap().into_split();
    let server = Server {
        reader: BufReader::new(read),
        writer: write,
    };
    (session, dispatcher, server)
}

async fn dispatch(dispatcher: &mut EventDispatcher, count: usize) {
    for _ in 0..count {
        assert!(dispatcher.dispatch_next().await, "session ended early");
    }
}

#[tokio::test]
async fn lobby_to_game_with_early_events() {
    let (session, mut dispatcher, mut server) = connect().await;
    let board_presenter = Arc::new(RecordingPresenter::new());
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let screens = Arc::new(Screens {
        board: board_presenter.clone(),
        game: Mutex::new(None),
        outcomes: outcomes.clone(),
    });
    let lobby = Arc::new(LobbySession::new("carol", session.clone(), screens.clone()).unwrap());
    session.set_listener(&lobby);

    // Handshake.
    server.say("CMD:GET_NAME\n").await;
    dispatch(&mut dispatcher, 2).await;
    assert_eq!(server.hear().await, "NAME carol");
    server.say("RESP:NAME_OK\n").await;
    dispatch(&mut dispatcher, 1).await;
    assert_eq!(server.hear().await, "LIST");

    // Join, then board and turn arrive before the game screen is ready.
    server
        .say(concat!(
            "RESP:JOIN_OK 5 O dave the brave\n",
            "NOTIFY:BOARD X EMPTY EMPTY EMPTY EMPTY EMPTY EMPTY EMPTY EMPTY\n",
            "NOTIFY:YOUR_TURN\n",
            "NOTIFY:BOARD X EMPTY EMPTY EMPTY EMPTY EMPTY EMPTY EMPTY X\n",
        ))
        .await;
    dispatch(&mut dispatcher, 4).await;

    let game = screens.game();
    assert_eq!(game.launch().opponent, "dave the brave");
    assert_eq!(game.phase(), MatchPhase::Initializing);
    assert!(board_presenter.calls().is_empty());

    game.mark_ready();
    assert_eq!(game.phase(), MatchPhase::Ready);
    assert!(game.my_turn());
    assert_eq!(
        board_presenter.last_board().map(|b| b.labels()),
        Some(["X", "", "", "", "", "", "", "", "X"])
    );
    assert_eq!(board_presenter.enabled_cells().len(), 7);

    // Optimistic move, rejected by the server, then retried.
    let center = Position::new(1, 1).unwrap();
    game.play(center).unwrap();
    assert!(game.play(center).is_err());
    assert_eq!(server.hear().await, "MOVE 1 1");

    server.say("ERROR:Invalid move\n").await;
    dispatch(&mut dispatcher, 1).await;
    assert!(game.my_turn());
    assert_eq!(board_presenter.enabled_cells().len(), 7);

    // Server goes away: one disconnect, one outcome, then the session ends.
    drop(server);
    while dispatcher.dispatch_next().await {}

    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![MatchOutcome::Disconnected(DisconnectReason::EndOfStream)]
    );
    assert_eq!(game.phase(), MatchPhase::Terminated);
    assert!(!session.is_active());
}

#[tokio::test]
async fn closing_the_session_is_quiet() {
    let (session, mut dispatcher, mut server) = connect().await;
    let presenter = Arc::new(RecordingPresenter::new());
    let lobby = Arc::new(LobbySession::new("erin", session.clone(), presenter.clone()).unwrap());
    session.set_listener(&lobby);

    lobby.create_game();
    assert_eq!(server.hear().await, "CREATE");

    session.close();
    session.close();
    while dispatcher.dispatch_next().await {}

    assert!(!lobby.is_closed());
    assert!(presenter
        .calls()
        .iter()
        .all(|call| !matches!(call, noughts_client::mock::PresenterCall::Message { .. })));

    // The server sees the stream end after the queued command.
    let mut rest = String::new();
    let read = server.reader.read_line(&mut rest).await.unwrap();
    assert_eq!(read, 0);
}
