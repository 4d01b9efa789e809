//! Drives the public contract end to end with an array-backed genotype
//! model: schema registration, typed access against real backing fields,
//! cultivar inheritance with selective overrides, whole-tree cloning,
//! locale-scoped enumeration and name localization.

use std::any::Any;

use paramtree::{
    ParamError, ParamKind, ParamModel, ParamSet, Result, SchemaRegistry, ALL_LOCALES,
};

/// Pasture genotype constants kept in plain backing fields, the way a
/// concrete physiological model stores them.
#[derive(Debug, Clone, Default)]
struct GenotypeModel {
    /// Light extinction per canopy layer and organ (`kq-1:4-leaf;stem`).
    light_extinction: [[f64; 2]; 4],
    /// Maximum rooting depth in mm (`maxrootdepth`).
    max_root_depth: f64,
    /// Live leaves per tiller (`leafnumber-vegetative;reproductive`).
    leaf_number: [i64; 2],
    /// Whether flowering tracks day length (`daylengthsensitive`).
    day_length_sensitive: bool,
    /// Free-form cultivar notes (`cultivarnotes`).
    notes: String,
    /// Canopy-mean extinction, recomputed by `derive_params`.
    mean_extinction: f64,
}

fn organ_index(segment: &str) -> usize {
    if segment == "leaf" {
        0
    } else {
        1
    }
}

impl ParamModel for GenotypeModel {
    fn define_entries(&self, schema: &mut SchemaRegistry) -> Result<()> {
        schema.define("kq-1:4-leaf;stem", ParamKind::Real)?;
        schema.define("maxrootdepth", ParamKind::Real)?;
        schema.define("leafnumber-vegetative;reproductive", ParamKind::Integer)?;
        schema.define("daylengthsensitive", ParamKind::Boolean)?;
        schema.define("cultivarnotes", ParamKind::Text)?;
        Ok(())
    }

    fn make_child(&self) -> Box<dyn ParamModel> {
        Box::new(GenotypeModel::default())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn real_value(&self, tags: &[String]) -> f64 {
        match tags[0].as_str() {
            "kq" => {
                let layer: usize = tags[1].parse().unwrap();
                self.light_extinction[layer - 1][organ_index(&tags[2])]
            }
            _ => self.max_root_depth,
        }
    }

    fn set_real_value(&mut self, tags: &[String], value: f64) {
        match tags[0].as_str() {
            "kq" => {
                let layer: usize = tags[1].parse().unwrap();
                self.light_extinction[layer - 1][organ_index(&tags[2])] = value;
            }
            _ => self.max_root_depth = value,
        }
    }

    fn int_value(&self, tags: &[String]) -> i64 {
        if tags[1] == "vegetative" {
            self.leaf_number[0]
        } else {
            self.leaf_number[1]
        }
    }

    fn set_int_value(&mut self, tags: &[String], value: i64) {
        if tags[1] == "vegetative" {
            self.leaf_number[0] = value;
        } else {
            self.leaf_number[1] = value;
        }
    }

    fn bool_value(&self, _tags: &[String]) -> bool {
        self.day_length_sensitive
    }

    fn set_bool_value(&mut self, _tags: &[String], value: bool) {
        self.day_length_sensitive = value;
    }

    fn text_value(&self, _tags: &[String]) -> String {
        self.notes.clone()
    }

    fn set_text_value(&mut self, _tags: &[String], value: &str) {
        self.notes = value.to_string();
    }

    fn derive_params(&mut self) {
        let total: f64 = self.light_extinction.iter().flatten().sum();
        self.mean_extinction = total / 8.0;
    }
}

fn base_genotype() -> ParamSet {
    let _ = env_logger::builder().is_test(true).try_init();

    let set = ParamSet::new_root(Box::new(GenotypeModel::default())).unwrap();
    set.set_version("7.2");
    set.set_english_name("Perennial Ryegrass");
    set.set_name("Perennial Ryegrass");
    set.add_locale(ALL_LOCALES);

    let leaf_extinction = [0.51, 0.52, 0.53, 0.54];
    for (index, value) in leaf_extinction.iter().enumerate() {
        let layer = index + 1;
        set.set_real(&format!("kq-{layer}-leaf"), *value).unwrap();
        set.set_real(&format!("kq-{layer}-stem"), 0.3).unwrap();
    }
    set.set_real("maxrootdepth", 650.0).unwrap();
    set.set_integer("leafnumber-vegetative", 3).unwrap();
    set.set_integer("leafnumber-reproductive", 2).unwrap();
    set.set_boolean("daylengthsensitive", false).unwrap();
    set.set_text("cultivarnotes", "base parameter set").unwrap();
    set
}

fn assert_same_values(left: &ParamSet, right: &ParamSet) {
    assert_eq!(left.param_count(), right.param_count());
    for index in 0..left.param_count() {
        let info = left.param_at(index).unwrap();
        assert_eq!(
            left.is_defined(&info.full_name),
            right.is_defined(&info.full_name),
            "definedness differs at {}",
            info.full_name
        );
        if left.is_defined(&info.full_name) {
            assert_eq!(
                left.value_text(&info.full_name).unwrap(),
                right.value_text(&info.full_name).unwrap(),
                "value differs at {}",
                info.full_name
            );
        }
    }
}

#[test]
fn values_land_in_the_backing_fields() {
    let base = base_genotype();
    assert_eq!(base.param_count(), 13);
    assert!(base.is_complete());

    base.with_model(|model| {
        let model = model.as_any().downcast_ref::<GenotypeModel>().unwrap();
        assert_eq!(model.light_extinction[0][0], 0.51);
        assert_eq!(model.light_extinction[3][1], 0.3);
        assert_eq!(model.max_root_depth, 650.0);
        assert_eq!(model.leaf_number, [3, 2]);
        assert_eq!(model.notes, "base parameter set");
    });
}

#[test]
fn cultivars_inherit_then_override() {
    let base = base_genotype();

    let nui = base.add_child().unwrap();
    nui.initialize(Some(&base)).unwrap();
    nui.set_name("Nui");
    nui.set_real("maxrootdepth", 800.0).unwrap();

    assert!(nui.is_complete());
    assert_eq!(nui.real("maxrootdepth").unwrap(), 800.0);
    assert_eq!(base.real("maxrootdepth").unwrap(), 650.0);
    assert_eq!(nui.version(), "7.2");

    // the bulk copy triggered the derive hook on the cultivar's model
    nui.with_model(|model| {
        let model = model.as_any().downcast_ref::<GenotypeModel>().unwrap();
        assert!((model.mean_extinction - 0.4125).abs() < 1e-12);
    });
}

#[test]
fn whole_trees_clone_into_independent_copies() {
    let base = base_genotype();

    let nui = base.add_child().unwrap();
    nui.initialize(Some(&base)).unwrap();
    nui.set_name("Nui");
    nui.set_locale_text("nz");
    nui.set_real("maxrootdepth", 800.0).unwrap();

    let kangaroo_valley = base.add_child().unwrap();
    kangaroo_valley.initialize(Some(&base)).unwrap();
    kangaroo_valley.set_name("Kangaroo Valley");
    kangaroo_valley.set_locale_text("au");

    let copy = ParamSet::new_root(Box::new(GenotypeModel::default())).unwrap();
    copy.copy_all(&base).unwrap();

    assert_eq!(copy.child_count(), base.child_count());
    assert_eq!(copy.name(), "Perennial Ryegrass");
    assert_same_values(&copy, &base);
    for index in 0..base.child_count() {
        let original = base.child(index).unwrap();
        let cloned = copy.child(index).unwrap();
        assert_eq!(cloned.name(), original.name());
        assert_eq!(cloned.locale_text(), original.locale_text());
        assert_same_values(&cloned, &original);
    }

    // the copy is a separate tree
    copy.child(0).unwrap().set_real("maxrootdepth", 555.0).unwrap();
    assert_eq!(base.child(0).unwrap().real("maxrootdepth").unwrap(), 800.0);
}

#[test]
fn leaf_enumeration_is_scoped_to_the_current_locale() {
    let base = base_genotype();

    let nui = base.add_child().unwrap();
    nui.initialize(Some(&base)).unwrap();
    nui.set_name("Nui");
    nui.set_locale_text("nz");

    let kangaroo_valley = base.add_child().unwrap();
    kangaroo_valley.initialize(Some(&base)).unwrap();
    kangaroo_valley.set_name("Kangaroo Valley");
    kangaroo_valley.set_locale_text("au");

    let common = base.add_child().unwrap();
    common.initialize(Some(&base)).unwrap();
    common.set_name("Common");
    common.set_locale_text(ALL_LOCALES);

    // setting the locale anywhere in the tree covers every node
    kangaroo_valley.set_current_locale("nz");
    assert_eq!(base.current_locale(), "nz");
    assert_eq!(base.leaf_count(false), 3);
    assert_eq!(base.leaf_count(true), 2);

    let names: Vec<String> = (0..base.leaf_count(true))
        .map(|index| base.leaf_at(index, true).unwrap().name())
        .collect();
    assert_eq!(names, ["Nui", "Common"]);
}

#[test]
fn display_names_localise_per_ui_language() {
    let base = base_genotype();
    base.add_translation("fr", "Ray-grass anglais");

    let nui = base.add_child().unwrap();
    nui.initialize(Some(&base)).unwrap();
    nui.set_english_name("Nui");
    // the child copied the base translations; replace with its own
    nui.remove_translation(0);
    nui.add_translation("fr", "Nui (fr)");

    base.set_ui_language("fr");
    base.localise_names();
    assert_eq!(base.name(), "Ray-grass anglais");
    assert_eq!(nui.name(), "Nui (fr)");

    base.set_ui_language("de");
    base.localise_names();
    assert_eq!(base.name(), "Perennial Ryegrass");
    assert_eq!(nui.name(), "Nui");
}

#[test]
fn access_errors_carry_the_offending_tag() {
    let base = base_genotype();

    let err = base.real("kq-9-leaf").unwrap_err();
    assert_eq!(err.to_string(), "unknown parameter name: kq-9-leaf");

    assert!(matches!(
        base.real("kq-1").unwrap_err(),
        ParamError::NotScalar { .. }
    ));
    assert!(matches!(
        base.integer("maxrootdepth").unwrap_err(),
        ParamError::TypeMismatch { .. }
    ));
    assert!(matches!(
        base.set_from_text("daylengthsensitive", "maybe").unwrap_err(),
        ParamError::Parse { .. }
    ));

    let empty = base.add_child().unwrap();
    assert!(matches!(
        empty.real("maxrootdepth").unwrap_err(),
        ParamError::Undefined { .. }
    ));
}
