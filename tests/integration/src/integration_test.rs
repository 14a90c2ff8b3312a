//! End-to-end integration test for the model-file slice
//!
//! Exercises the complete flow: fixture on disk -> load -> structural
//! edits -> save -> reload, for both unit collections and control files.

use flomod_control::{ControlFile, ModelFileKind, Position};
use flomod_core::Scope;
use flomod_dat::unit::rows;
use flomod_dat::{AddOptions, DatFile, Registry, UnitRecord, UnitType};
use flomod_test_utils::TestModel;
use pretty_assertions::assert_eq;

#[test]
fn dat_load_edit_save_reload() {
    let _ = flomod_core::logging::init();
    let model = TestModel::new();
    let path = model.write_dat("runs/baseline.dat", &["1.067", "1.068"]);

    let registry = Registry::standard();
    let mut file = DatFile::load(&path, &registry).unwrap();
    assert_eq!(file.collection.node_count(), 2);
    assert_eq!(
        file.collection.units_by_type(&[UnitType::River]).len(),
        2
    );

    // Insert a new section and let the collection sync the IC table.
    file.collection
        .add_unit(UnitRecord::new("1.069", UnitType::River), AddOptions::default())
        .unwrap();
    assert_eq!(file.collection.node_count(), 3);
    file.save(&registry).unwrap();

    let reloaded = DatFile::load(&path, &registry).unwrap();
    assert_eq!(reloaded.collection.node_count(), 3);
    let ic = reloaded
        .collection
        .get_unit_of_type(UnitType::InitialConditions)
        .unwrap();
    assert_eq!(ic.rows.len(), 3);
    assert_eq!(
        ic.rows[2].get(rows::LABEL).unwrap().as_text(),
        Some("1.069")
    );
}

#[test]
fn dat_round_trips_byte_exact_through_disk() {
    let model = TestModel::new();
    let path = model.write_dat("baseline.dat", &["1.067", "1.068", "1.069"]);
    let original = model.read_file("baseline.dat");

    let registry = Registry::standard();
    let file = DatFile::load(&path, &registry).unwrap();
    file.save(&registry).unwrap();

    assert_eq!(model.read_file("baseline.dat"), original);
}

#[test]
fn control_file_load_edit_save_reload() {
    let model = TestModel::new();
    let lines = flomod_test_utils::model::tcf_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let path = model.write_file("main.tcf", &refs);

    let mut cf = ControlFile::load(&path, ModelFileKind::Tcf).unwrap();
    assert_eq!(cf.files(None, None).len(), 1);

    let parent = cf.main_file().id();
    let part = flomod_control::Part::new_variable(parent, "End Time", "3");
    cf.add_part(part, Position::Default).unwrap();
    cf.save().unwrap();

    let reloaded = ControlFile::load(&path, ModelFileKind::Tcf).unwrap();
    let end_time = reloaded.variables(Some("End Time"), None);
    assert_eq!(end_time.len(), 1);
    assert_eq!(end_time[0].value(), Some("3"));

    // Scoped queries see exactly one branch of the scenario chain.
    let dev = Scope::from_values(&["DEV"], &[]);
    let cell = reloaded.all_variables(Some("Cell Size"), Some(&dev));
    assert_eq!(cell.len(), 1);
    assert_eq!(cell[0].value(), Some("5"));
}

#[test]
fn control_file_round_trips_byte_exact_through_disk() {
    let model = TestModel::new();
    let lines = flomod_test_utils::model::tcf_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let path = model.write_file("main.tcf", &refs);

    let cf = ControlFile::load(&path, ModelFileKind::Tcf).unwrap();
    cf.save().unwrap();

    assert_eq!(model.read_file("main.tcf"), lines);
}

#[test]
fn initialised_dat_writes_a_loadable_file() {
    let model = TestModel::new();
    let path = model.root().join("fresh.dat");

    let registry = Registry::standard();
    let collection = flomod_dat::UnitCollection::initialised_dat(
        &path,
        vec![UnitRecord::new("1.067", UnitType::River)],
    )
    .unwrap();
    let file = DatFile { collection };
    file.save(&registry).unwrap();

    let reloaded = DatFile::load(&path, &registry).unwrap();
    assert_eq!(reloaded.collection[0].unit_type(), UnitType::Header);
    assert_eq!(reloaded.collection.node_count(), 1);
    assert_eq!(
        reloaded
            .collection
            .index_of_type(UnitType::InitialConditions),
        Some(reloaded.collection.len() - 1)
    );
}
