//! Standard catalog of tool descriptors.
//!
//! Only the descriptors live here. The tools themselves are external and are
//! bound into a [`CapabilityRegistry`](crate::CapabilityRegistry) by the caller.

use taskweave_core::CapabilityInfo;

/// Expected duration assumed for a tool the registry does not know.
pub const DEFAULT_EXPECTED_DURATION_SECS: f64 = 30.0;

/// Descriptors for the standard tool set.
pub fn standard_catalog() -> Vec<CapabilityInfo> {
    vec![
        CapabilityInfo::new("vision_detect")
            .with_inputs(["image", "screenshot"])
            .with_outputs(["components", "bounding_boxes"])
            .with_cost(1024, 2)
            .with_duration(30.0),
        CapabilityInfo::new("ocr")
            .with_inputs(["image", "screenshot", "regions"])
            .with_outputs(["text", "text_regions"])
            .with_cost(512, 1)
            .with_duration(15.0),
        CapabilityInfo::new("ui2code")
            .with_inputs(["layout_graph", "components", "text_regions"])
            .with_outputs(["react_components", "jsx", "css"])
            .with_declared_dependencies(["vision_detect", "ocr"])
            .with_cost(256, 1)
            .with_duration(45.0),
        CapabilityInfo::new("nl2api")
            .with_inputs(["natural_language", "specification", "ui_components"])
            .with_outputs(["fastapi_code", "endpoints", "models"])
            .with_cost(512, 1)
            .with_duration(60.0),
        CapabilityInfo::new("quality")
            .with_inputs(["code", "directory", "files"])
            .with_outputs(["quality_report", "suggestions", "fixes"])
            .with_cost(128, 1)
            .with_duration(20.0),
        CapabilityInfo::new("doc_gen")
            .with_inputs(["openapi_spec", "code", "api_endpoints"])
            .with_outputs(["documentation", "examples", "guides"])
            .with_cost(64, 1)
            .with_duration(10.0),
        CapabilityInfo::new("file_ops")
            .with_inputs(["files", "directories", "project_structure"])
            .with_outputs(["project", "integration", "deployment"])
            .with_cost(32, 1)
            .with_duration(5.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let catalog = standard_catalog();
        let names: HashSet<_> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), catalog.len());
        assert_eq!(catalog.len(), 7);
    }

    #[test]
    fn test_catalog_declared_dependencies_resolve() {
        let catalog = standard_catalog();
        let names: HashSet<_> = catalog.iter().map(|c| c.name.as_str()).collect();
        for info in &catalog {
            for dep in &info.declared_dependencies {
                assert!(names.contains(dep.as_str()), "{} hints unknown {}", info.name, dep);
            }
        }
    }

    #[test]
    fn test_catalog_costs() {
        let catalog = standard_catalog();
        let vision = catalog.iter().find(|c| c.name == "vision_detect").unwrap();
        assert_eq!(vision.resource_cost.memory_units, 1024);
        assert_eq!(vision.resource_cost.cpu_units, 2);
        assert_eq!(vision.expected_duration_seconds, 30.0);
    }
}
