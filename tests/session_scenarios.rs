//! End-to-end drill scenarios against both store backends.

use std::collections::HashSet;

use streakdrill::models::{Collection, Direction, Word, MASTERY_THRESHOLD};
use streakdrill::session::{Phase, Session, SessionSettings, Turn};
use streakdrill::store::{MemoryStore, ProgressStore, RunStore, SqliteStore};
use tempfile::TempDir;

fn word(id: &str, prompt: &str, answer: &str) -> Word {
    Word {
        id: id.to_string(),
        prompt: prompt.to_string(),
        answer: answer.to_string(),
        part_of_speech: None,
        examples: Vec::new(),
        notes: None,
        tags: Vec::new(),
    }
}

fn two_word_deck() -> Collection {
    Collection::vocabulary("greetings", "Greetings", vec![word("hallo", "hallo", "hello"), word("tschuess", "tschüss", "bye")])
}

fn settings(seed: u64) -> SessionSettings {
    SessionSettings {
        seed: Some(seed),
        ..SessionSettings::default()
    }
}

fn sqlite_store(temp_dir: &TempDir) -> SqliteStore {
    SqliteStore::open(&temp_dir.path().join("progress.db")).unwrap()
}

#[test]
fn test_always_correct_finishes_after_threshold_answers_per_task() {
    for seed in 0..10 {
        let store = MemoryStore::new();
        let mut session = Session::new(two_word_deck(), &store, &settings(seed));
        session.load().unwrap();
        let total = session.total_count();

        let mut submissions = 0;
        while !session.is_finished() {
            session.submit_answer(true).unwrap();
            submissions += 1;
            assert!(submissions <= total * MASTERY_THRESHOLD as usize);
        }

        assert_eq!(submissions, total * MASTERY_THRESHOLD as usize);
    }
}

#[test]
fn test_one_miss_then_twelve_correct_answers_finish_the_deck() {
    let temp_dir = TempDir::new().unwrap();
    let store = sqlite_store(&temp_dir);
    let mut session = Session::new(two_word_deck(), &store, &settings(3));
    session.load().unwrap();
    assert_eq!(session.total_count(), 4);

    let missed = session.current_key().cloned().unwrap();
    assert!(matches!(session.submit_answer(false).unwrap(), Turn::Next(_)));
    assert_eq!(store.get("greetings", &missed.item_id, missed.direction).unwrap(), 0);

    let mut correct = 0;
    let mut last = None;
    while !session.is_finished() {
        last = Some(session.submit_answer(true).unwrap());
        correct += 1;
        assert!(correct <= 12);
    }

    assert_eq!(correct, 12);
    assert_eq!(session.completed_count(), 4);
    assert_eq!(session.total_count(), 4);
    let Some(Turn::Finished(stats)) = last else {
        panic!("expected a finished turn");
    };
    assert_eq!(stats.mistakes, 1);
    assert_eq!(stats.answers, 13);
    assert_eq!(store.run_summary("greetings").unwrap().circles, 1);
}

#[test]
fn test_mastered_tasks_are_never_served_again() {
    let store = MemoryStore::new();
    let mut session = Session::new(two_word_deck(), &store, &settings(17));
    session.load().unwrap();

    let mut mastered = HashSet::new();
    let mut turn = 0;
    while let Some(key) = session.current_key().cloned() {
        assert!(!mastered.contains(&key), "{} served after mastery", key);
        let correct = turn % 4 != 3;
        session.submit_answer(correct).unwrap();
        if session.tasks().get(&key).unwrap().is_mastered() {
            mastered.insert(key);
        }
        turn += 1;
        assert!(turn < 1_000);
    }
    assert!(session.is_finished());
}

#[test]
fn test_empty_collection_is_finished_without_picking() {
    let store = MemoryStore::new();
    let empty = Collection::vocabulary("empty", "Empty", Vec::new());
    let mut session = Session::new(empty, &store, &settings(1));

    assert!(!session.is_finished());
    assert_eq!(session.load().unwrap(), Phase::Finished);

    assert!(session.is_finished());
    assert_eq!(session.total_count(), 0);
    assert!(session.tasks().all().is_empty());
    assert!(session.scheduler().current().is_none());
    assert!(session.current_task().unwrap().is_none());
    assert_eq!(store.run_summary("empty").unwrap().circles, 0);
}

#[test]
fn test_reset_only_touches_its_collection() {
    let temp_dir = TempDir::new().unwrap();
    let store = sqlite_store(&temp_dir);
    store.set("numbers", "eins", Direction::Forward, 2).unwrap();

    let mut session = Session::new(two_word_deck(), &store, &settings(5));
    session.load().unwrap();
    for _ in 0..5 {
        session.submit_answer(true).unwrap();
    }
    assert!(!store.get_collection("greetings").unwrap().is_empty());

    session.reset_progress().unwrap();

    for w in ["hallo", "tschuess"] {
        for direction in Direction::VOCABULARY {
            assert_eq!(store.get("greetings", w, direction).unwrap(), 0);
        }
    }
    assert!(store.get_collection("greetings").unwrap().is_empty());
    assert_eq!(store.get("numbers", "eins", Direction::Forward).unwrap(), 2);
    assert_eq!(session.completed_count(), 0);
    assert_eq!(session.phase(), Phase::Active);
}

#[test]
fn test_progress_resumes_in_a_new_session() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = sqlite_store(&temp_dir);
        let mut session = Session::new(two_word_deck(), store, &settings(9));
        session.load().unwrap();
        while session.completed_count() == 0 {
            session.submit_answer(true).unwrap();
        }
    }

    let store = sqlite_store(&temp_dir);
    let mut session = Session::new(two_word_deck(), store, &settings(10));
    session.load().unwrap();
    assert!(session.completed_count() >= 1);
    let current = session.current_key().unwrap();
    assert!(!session.tasks().get(current).unwrap().is_mastered());
}

#[test]
fn test_no_immediate_repeat_while_pool_shrinks() {
    let deck = Collection::vocabulary(
        "colors",
        "Colors",
        vec![
            word("rot", "rot", "red"),
            word("blau", "blau", "blue"),
            word("gruen", "grün", "green"),
            word("gelb", "gelb", "yellow"),
        ],
    );

    for seed in 0..40 {
        let store = MemoryStore::new();
        let mut session = Session::new(deck.clone(), &store, &settings(seed));
        session.load().unwrap();

        let mut turn = 0u64;
        while let Some(previous) = session.current_key().cloned() {
            let correct = (turn * 7 + seed) % 5 != 0;
            session.submit_answer(correct).unwrap();
            if session.tasks().incomplete_count() > 1 {
                let next = session.current_key().unwrap();
                assert_ne!(next, &previous, "seed {} turn {}", seed, turn);
            }
            turn += 1;
            assert!(turn < 2_000, "seed {} did not finish", seed);
        }
        assert!(session.is_finished());
    }
}
