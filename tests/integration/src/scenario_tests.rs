//! Multi-file model scenarios: include splicing, relocation, and scoped
//! queries across a realistic run layout.

use flomod_control::{Anchor, ContainsQuery, ControlFile, ModelFileKind};
use flomod_core::Scope;
use flomod_test_utils::TestModel;
use pretty_assertions::assert_eq;

/// A run directory with a main control file, a geometry file it references,
/// and the GIS layers both of them read.
fn setup_run(model: &TestModel) -> (std::path::PathBuf, std::path::PathBuf) {
    model.write_file("gis/code.shp", &["stub"]);
    model.write_file("gis/z_line.shp", &["stub"]);
    let tgc = model.write_file("model.tgc", &["Read GIS Z Line == gis/z_line.shp"]);
    let tcf = model.write_file(
        "main.tcf",
        &[
            "! run configuration",
            "Geometry Control File == model.tgc",
            "Read GIS Code == gis/code.shp",
            "If Scenario == DEV",
            "\tCell Size == 5",
            "Else",
            "\tCell Size == 1",
            "End If",
        ],
    );
    (tcf, tgc)
}

#[test]
fn spliced_aggregate_queries_span_both_files() {
    let model = TestModel::new();
    let (tcf, tgc) = setup_run(&model);

    let mut cf = ControlFile::load(&tcf, ModelFileKind::Tcf).unwrap();
    let child = ControlFile::load(&tgc, ModelFileKind::Tgc).unwrap();
    let anchor = cf.main_file().id();
    cf.add_control_file(child, Anchor::After(anchor)).unwrap();

    assert_eq!(cf.control_files().len(), 2);
    assert_eq!(cf.files(None, None).len(), 3);
    assert_eq!(
        cf.contains(ContainsQuery {
            filename: Some("z_line"),
            ..ContainsQuery::default()
        })
        .len(),
        1
    );
}

#[test]
fn removing_an_include_leaves_the_parent_untouched() {
    let model = TestModel::new();
    let (tcf, tgc) = setup_run(&model);

    let mut cf = ControlFile::load(&tcf, ModelFileKind::Tcf).unwrap();
    let solo = cf.printable_contents();

    let child = ControlFile::load(&tgc, ModelFileKind::Tgc).unwrap();
    let child_id = child.main_file().id();
    let anchor = cf.main_file().id();
    cf.add_control_file(child, Anchor::After(anchor)).unwrap();
    cf.remove_control_file(child_id).unwrap();

    assert_eq!(cf.printable_contents(), solo);
}

#[test]
fn missing_paths_are_reported_per_scope() {
    let model = TestModel::new();
    let (tcf, _) = setup_run(&model);
    let mut cf = ControlFile::load(&tcf, ModelFileKind::Tcf).unwrap();

    // Everything referenced by the main file exists except the geometry
    // file's own referents, which are not part of this aggregate.
    assert!(cf.check_paths_exist(None).is_empty());

    let parent = cf.main_file().id();
    let ghost = flomod_control::Part::new_file(
        parent,
        "Read GIS Mat",
        flomod_core::PathInfo::new(model.root(), "gis/materials.shp"),
    );
    cf.add_part(ghost, flomod_control::Position::Default).unwrap();

    let missing = cf.check_paths_exist(None);
    assert_eq!(missing.len(), 1);
    assert_eq!(
        missing[0].path().unwrap().relative_str(),
        "gis/materials.shp"
    );
}

#[test]
fn relocated_model_keeps_relative_structure() {
    let model = TestModel::new();
    let (tcf, _) = setup_run(&model);
    let mut cf = ControlFile::load(&tcf, ModelFileKind::Tcf).unwrap();

    // Copy the layers to a new root, then point the model at it.
    let moved = TestModel::new();
    moved.write_file("gis/code.shp", &["stub"]);
    cf.update_root(moved.root(), true).unwrap();

    let code = cf.files(Some("Read GIS Code"), None);
    assert_eq!(
        code[0].path().unwrap().absolute(),
        moved.root().join("gis/code.shp")
    );
    assert!(
        cf.main_file()
            .path
            .absolute()
            .starts_with(moved.root())
    );
}

#[test]
fn scenario_scope_partitions_the_variables() {
    let model = TestModel::new();
    let (tcf, _) = setup_run(&model);
    let cf = ControlFile::load(&tcf, ModelFileKind::Tcf).unwrap();

    let dev = Scope::from_values(&["DEV"], &[]);
    let exg = Scope::from_values(&["EXG"], &[]);
    let dev_vars = cf.all_variables(Some("Cell Size"), Some(&dev));
    let exg_vars = cf.all_variables(Some("Cell Size"), Some(&exg));

    assert_eq!(dev_vars[0].value(), Some("5"));
    assert_eq!(exg_vars[0].value(), Some("1"));
    assert_eq!(cf.all_variables(Some("Cell Size"), None).len(), 2);
}
