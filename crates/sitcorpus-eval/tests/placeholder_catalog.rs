use sitcorpus_core::Category;
use sitcorpus_eval::is_placeholder;
use sitcorpus_generate::generators::BUILTIN_IDS;
use sitcorpus_generate::{GenerationContext, ValueLibrary, ValueOrigin};

fn builtin_catalog() -> Vec<Category> {
    BUILTIN_IDS
        .iter()
        .map(|id| Category::new(*id, id.trim_start_matches("SIT_").replace('_', " ")))
        .collect()
}

#[test]
fn every_builtin_placeholder_reads_as_placeholder() {
    let catalog = builtin_catalog();
    let library = ValueLibrary::new(&catalog);
    let mut ctx = GenerationContext::new(17);

    for id in BUILTIN_IDS {
        let generated = library.generate_value(id, false, &mut ctx);
        assert_eq!(generated.origin, ValueOrigin::Placeholder, "{id}");
        assert!(
            is_placeholder(&generated.value),
            "{id} placeholder {:?} would count as a leaked value",
            generated.value
        );
    }
}

#[test]
fn fallback_values_read_as_placeholders_for_both_labels() {
    let catalog = vec![Category::new("SIT_EMPLOYEE_BADGE", "Employee Badge")];
    let library = ValueLibrary::new(&catalog);
    let mut ctx = GenerationContext::new(3);

    for want_valid in [true, false] {
        let generated = library.generate_value("SIT_EMPLOYEE_BADGE", want_valid, &mut ctx);
        assert_eq!(generated.origin, ValueOrigin::Fallback);
        assert!(is_placeholder(&generated.value), "{:?}", generated.value);
    }

    let unknown = library.generate_value("SIT_NOT_IN_CATALOG", false, &mut ctx);
    assert!(is_placeholder(&unknown.value), "{:?}", unknown.value);
}
