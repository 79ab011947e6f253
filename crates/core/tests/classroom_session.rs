use std::{fs, path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use tempfile::tempdir;
use tombola_core::{
    pools::parse_entries, DrawEngine, FileListStore, GameMode, ListKey, StoreError, TombolaError,
    Trigger, TriggerArbiter, TriggerOutcome,
};

fn open_arbiter(root: &Path, seed: u64) -> Result<TriggerArbiter<FileListStore>> {
    let store = Arc::new(FileListStore::open(root)?);
    let engine = DrawEngine::with_seed(store, 3, seed);
    Ok(TriggerArbiter::new(engine, Duration::from_secs(1)))
}

fn read_list(root: &Path, key: ListKey) -> Result<Vec<String>> {
    Ok(parse_entries(&fs::read_to_string(root.join(key.file_name()))?))
}

fn single_name(outcome: TriggerOutcome) -> String {
    match outcome {
        TriggerOutcome::Drawn { outcome, .. } => outcome.names()[0].to_string(),
        other => panic!("expected a draw, got {other:?}"),
    }
}

#[test]
fn draw_twice_then_reset_restores_original_order() -> Result<()> {
    let dir = tempdir()?;
    let arbiter = open_arbiter(dir.path(), 5)?;
    arbiter.bulk_load_roster(&parse_entries("Ana\nLuis\nZoe\n"))?;

    let first = single_name(arbiter.submit(Trigger::Draw)?);
    let second = single_name(arbiter.submit(Trigger::Draw)?);
    assert_ne!(first, second);

    let left = read_list(dir.path(), ListKey::Roster)?;
    assert_eq!(left.len(), 1);
    assert!(left[0] != first && left[0] != second);

    arbiter.submit(Trigger::ResetRoster)?;
    assert_eq!(read_list(dir.path(), ListKey::Roster)?, vec!["Ana", "Luis", "Zoe"]);
    Ok(())
}

#[test]
fn drawn_names_stay_out_across_restarts() -> Result<()> {
    let dir = tempdir()?;
    let drawn = {
        let arbiter = open_arbiter(dir.path(), 9)?;
        arbiter.bulk_load_roster(&parse_entries("Ana\nLuis\nZoe\nMarta"))?;
        single_name(arbiter.submit(Trigger::Draw)?)
    };

    let arbiter = open_arbiter(dir.path(), 10)?;
    assert_eq!(arbiter.current_mode()?, GameMode::Individual);
    let mut rest = Vec::new();
    for _ in 0..3 {
        rest.push(single_name(arbiter.submit(Trigger::Draw)?));
    }
    assert!(!rest.contains(&drawn));
    assert!(matches!(
        arbiter.submit(Trigger::Draw),
        Err(TombolaError::EmptyPool(_))
    ));
    Ok(())
}

#[test]
fn paired_mode_exhausting_questions_keeps_roster() -> Result<()> {
    let dir = tempdir()?;
    let arbiter = open_arbiter(dir.path(), 1)?;
    arbiter.bulk_load_roster_and_questions(
        &parse_entries("Ana\nLuis\nZoe"),
        &parse_entries("¿Capital de Perú?"),
    )?;
    arbiter.submit(Trigger::AdvanceMode)?;

    arbiter.submit(Trigger::Draw)?;
    assert!(arbiter.submit(Trigger::Draw).is_err());

    let status = arbiter.status()?;
    assert_eq!(status.roster.remaining, 2);
    assert_eq!(status.questions.remaining, 0);

    arbiter.submit(Trigger::ResetAll)?;
    let status = arbiter.status()?;
    assert_eq!(status.roster.remaining, 3);
    assert_eq!(status.questions.remaining, 1);
    Ok(())
}

#[test]
fn second_device_on_same_root_cannot_draw() -> Result<()> {
    let dir = tempdir()?;
    let panel = open_arbiter(dir.path(), 2)?;
    let names: Vec<String> = (0..60).map(|index| format!("Alumno {index}")).collect();
    panel.bulk_load_roster(&names)?;

    let intruder = open_arbiter(dir.path(), 3);
    assert!(matches!(
        intruder.as_ref().err().and_then(|err| err.downcast_ref::<StoreError>()),
        Some(StoreError::Locked { .. })
    ));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let arbiter = panel.clone();
            std::thread::spawn(move || {
                (0..20)
                    .map(|_| arbiter.submit(Trigger::Draw).map(single_name))
                    .collect::<Result<Vec<_>, _>>()
            })
        })
        .collect();
    let mut drawn = Vec::new();
    for handle in handles {
        drawn.extend(handle.join().expect("draw thread panicked")?);
    }
    drawn.sort();
    drawn.dedup();

    assert_eq!(drawn.len(), 40);
    assert_eq!(read_list(dir.path(), ListKey::Roster)?.len(), 20);
    drop(panel);
    assert!(open_arbiter(dir.path(), 4).is_ok());
    Ok(())
}
