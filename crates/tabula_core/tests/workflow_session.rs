mod common;

use common::{create_user, solid_png, WHITE};
use tabula_core::{
    open_db_in_memory, AlignmentWorkflow, NoGlyphs, SessionError, SqliteTabulaRepository,
    SqliteUserRepository, SqliteWorkflowStateRepository, TabulaService, WorkflowEngine,
    WorkflowError, WorkflowSession, WorkflowStateRepository,
};

const ALIGN: &str = "align";

#[test]
fn session_persists_each_step_and_refuses_finished_instances() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    TabulaService::new(SqliteTabulaRepository::new(&conn))
        .import_tabula(owner.id, "crypt", solid_png(500, 500, WHITE))
        .unwrap();
    let users = SqliteUserRepository::new(&conn);
    let tabulas = SqliteTabulaRepository::new(&conn);
    let mut engine = WorkflowEngine::new();
    engine
        .register(AlignmentWorkflow::new(&users, &tabulas, &NoGlyphs))
        .unwrap();
    let session = WorkflowSession::new(&engine, SqliteWorkflowStateRepository::new(&conn));

    assert!(matches!(
        session.respond(owner.id, ALIGN, "yes"),
        Err(SessionError::NotStarted { .. })
    ));
    assert!(matches!(
        session.current(owner.id, ALIGN),
        Err(SessionError::NotStarted { .. })
    ));

    let reply = session.start(owner.id, ALIGN, "crypt").unwrap();
    assert_eq!(reply.state, "confirm");
    assert!(!reply.is_finished());
    assert_eq!(reply.message.choice_ids(), vec!["yes", "no"]);

    let reply = session.respond(owner.id, ALIGN, "yes").unwrap();
    assert_eq!(reply.state, "vertical_a");
    assert!(reply.message.image.is_some());
    let stored = SqliteWorkflowStateRepository::new(&conn)
        .load_state(owner.id, ALIGN)
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, "vertical_a");

    // A rejected answer leaves the stored instance untouched.
    let err = session.respond(owner.id, ALIGN, "maybe").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Workflow(WorkflowError::InvalidChoice { .. })
    ));
    let unchanged = SqliteWorkflowStateRepository::new(&conn)
        .load_state(owner.id, ALIGN)
        .unwrap()
        .unwrap();
    assert_eq!(unchanged, stored);
    assert_eq!(session.current(owner.id, ALIGN).unwrap().state, "vertical_a");

    assert!(session.abandon(owner.id, ALIGN).unwrap());
    assert!(!session.abandon(owner.id, ALIGN).unwrap());

    session.start(owner.id, ALIGN, "crypt").unwrap();
    let reply = session.respond(owner.id, ALIGN, "no").unwrap();
    assert_eq!(reply.state, "exit");
    assert!(reply.is_finished());
    assert!(matches!(
        session.respond(owner.id, ALIGN, "yes"),
        Err(SessionError::Finished { .. })
    ));
    assert_eq!(session.current(owner.id, ALIGN).unwrap().state, "exit");

    // Starting again replaces the finished instance.
    let reply = session.start(owner.id, ALIGN, "crypt").unwrap();
    assert_eq!(reply.state, "confirm");
}

#[test]
fn start_errors_store_nothing() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    let users = SqliteUserRepository::new(&conn);
    let tabulas = SqliteTabulaRepository::new(&conn);
    let mut engine = WorkflowEngine::new();
    engine
        .register(AlignmentWorkflow::new(&users, &tabulas, &NoGlyphs))
        .unwrap();
    let session = WorkflowSession::new(&engine, SqliteWorkflowStateRepository::new(&conn));
    let states = SqliteWorkflowStateRepository::new(&conn);

    let err = session.start(owner.id, ALIGN, "").unwrap_err();
    assert!(matches!(err, SessionError::Workflow(WorkflowError::Rejected(_))));
    assert!(states.load_state(owner.id, ALIGN).unwrap().is_none());

    assert!(matches!(
        session.start(owner.id, "calibrate", "crypt"),
        Err(SessionError::Workflow(WorkflowError::UnknownWorkflow(_)))
    ));

    assert!(matches!(
        session.start(owner.id, ALIGN, "crypt"),
        Err(SessionError::Workflow(WorkflowError::Rejected(_)))
    ));
    assert!(states.load_state(owner.id, ALIGN).unwrap().is_none());
}
