//! Classification of IFC entity types

use serde::{Deserialize, Serialize};

/// Role of an entity as far as the checker is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    /// Any concrete `IfcElement` subtype
    Element,
    /// Any concrete `IfcGroup` subtype
    Group,
    /// Everything else (spatial structure, relationships, resources)
    Other,
}

const GROUP_TYPES: &[&str] = &[
    "IFCGROUP",
    "IFCZONE",
    "IFCSYSTEM",
    "IFCBUILDINGSYSTEM",
    "IFCBUILTSYSTEM",
    "IFCDISTRIBUTIONSYSTEM",
    "IFCDISTRIBUTIONCIRCUIT",
    "IFCSTRUCTURALANALYSISMODEL",
    "IFCSTRUCTURALLOADGROUP",
    "IFCSTRUCTURALLOADCASE",
    "IFCSTRUCTURALRESULTGROUP",
    "IFCINVENTORY",
    "IFCASSET",
];

// Concrete IfcElement subtypes of IFC2X3, IFC4 and IFC4X3.
const ELEMENT_TYPES: &[&str] = &[
    // building elements
    "IFCBEAM",
    "IFCBEAMSTANDARDCASE",
    "IFCBEARING",
    "IFCBUILDINGELEMENTPART",
    "IFCBUILDINGELEMENTPROXY",
    "IFCCAISSONFOUNDATION",
    "IFCCHIMNEY",
    "IFCCOLUMN",
    "IFCCOLUMNSTANDARDCASE",
    "IFCCOURSE",
    "IFCCOVERING",
    "IFCCURTAINWALL",
    "IFCDEEPFOUNDATION",
    "IFCDOOR",
    "IFCDOORSTANDARDCASE",
    "IFCEARTHWORKSELEMENT",
    "IFCEARTHWORKSFILL",
    "IFCFOOTING",
    "IFCKERB",
    "IFCMEMBER",
    "IFCMEMBERSTANDARDCASE",
    "IFCMOORINGDEVICE",
    "IFCNAVIGATIONELEMENT",
    "IFCPAVEMENT",
    "IFCPILE",
    "IFCPLATE",
    "IFCPLATESTANDARDCASE",
    "IFCRAIL",
    "IFCRAILING",
    "IFCRAMP",
    "IFCRAMPFLIGHT",
    "IFCREINFORCEDSOIL",
    "IFCROOF",
    "IFCSHADINGDEVICE",
    "IFCSLAB",
    "IFCSLABELEMENTEDCASE",
    "IFCSLABSTANDARDCASE",
    "IFCSTAIR",
    "IFCSTAIRFLIGHT",
    "IFCTRACKELEMENT",
    "IFCWALL",
    "IFCWALLELEMENTEDCASE",
    "IFCWALLSTANDARDCASE",
    "IFCWINDOW",
    "IFCWINDOWSTANDARDCASE",
    // components and features
    "IFCDISCRETEACCESSORY",
    "IFCFASTENER",
    "IFCIMPACTPROTECTIONDEVICE",
    "IFCMECHANICALFASTENER",
    "IFCREINFORCINGBAR",
    "IFCREINFORCINGMESH",
    "IFCSIGN",
    "IFCTENDON",
    "IFCTENDONANCHOR",
    "IFCTENDONCONDUIT",
    "IFCVIBRATIONDAMPER",
    "IFCVIBRATIONISOLATOR",
    "IFCOPENINGELEMENT",
    "IFCOPENINGSTANDARDCASE",
    "IFCPROJECTIONELEMENT",
    "IFCSURFACEFEATURE",
    "IFCVOIDINGFEATURE",
    // distribution elements
    "IFCACTUATOR",
    "IFCAIRTERMINAL",
    "IFCAIRTERMINALBOX",
    "IFCAIRTOAIRHEATRECOVERY",
    "IFCALARM",
    "IFCAUDIOVISUALAPPLIANCE",
    "IFCBOILER",
    "IFCBURNER",
    "IFCCABLECARRIERFITTING",
    "IFCCABLECARRIERSEGMENT",
    "IFCCABLEFITTING",
    "IFCCABLESEGMENT",
    "IFCCHILLER",
    "IFCCOIL",
    "IFCCOMMUNICATIONSAPPLIANCE",
    "IFCCOMPRESSOR",
    "IFCCONDENSER",
    "IFCCONTROLLER",
    "IFCCOOLEDBEAM",
    "IFCCOOLINGTOWER",
    "IFCDAMPER",
    "IFCDISTRIBUTIONCHAMBERELEMENT",
    "IFCDISTRIBUTIONCONTROLELEMENT",
    "IFCDISTRIBUTIONELEMENT",
    "IFCDISTRIBUTIONFLOWELEMENT",
    "IFCDUCTFITTING",
    "IFCDUCTSEGMENT",
    "IFCDUCTSILENCER",
    "IFCELECTRICAPPLIANCE",
    "IFCELECTRICDISTRIBUTIONBOARD",
    "IFCELECTRICFLOWSTORAGEDEVICE",
    "IFCELECTRICGENERATOR",
    "IFCELECTRICMOTOR",
    "IFCELECTRICTIMECONTROL",
    "IFCENERGYCONVERSIONDEVICE",
    "IFCENGINE",
    "IFCEVAPORATIVECOOLER",
    "IFCEVAPORATOR",
    "IFCFAN",
    "IFCFILTER",
    "IFCFIRESUPPRESSIONTERMINAL",
    "IFCFLOWCONTROLLER",
    "IFCFLOWFITTING",
    "IFCFLOWINSTRUMENT",
    "IFCFLOWMETER",
    "IFCFLOWMOVINGDEVICE",
    "IFCFLOWSEGMENT",
    "IFCFLOWSTORAGEDEVICE",
    "IFCFLOWTERMINAL",
    "IFCFLOWTREATMENTDEVICE",
    "IFCHEATEXCHANGER",
    "IFCHUMIDIFIER",
    "IFCINTERCEPTOR",
    "IFCJUNCTIONBOX",
    "IFCLAMP",
    "IFCLIGHTFIXTURE",
    "IFCMEDICALDEVICE",
    "IFCMOTORCONNECTION",
    "IFCOUTLET",
    "IFCPIPEFITTING",
    "IFCPIPESEGMENT",
    "IFCPROTECTIVEDEVICE",
    "IFCPROTECTIVEDEVICETRIPPINGUNIT",
    "IFCPUMP",
    "IFCSANITARYTERMINAL",
    "IFCSENSOR",
    "IFCSOLARDEVICE",
    "IFCSPACEHEATER",
    "IFCSTACKTERMINAL",
    "IFCSWITCHINGDEVICE",
    "IFCTANK",
    "IFCTRANSFORMER",
    "IFCTUBEBUNDLE",
    "IFCUNITARYCONTROLELEMENT",
    "IFCUNITARYEQUIPMENT",
    "IFCVALVE",
    "IFCWASTETERMINAL",
    // other elements
    "IFCCIVILELEMENT",
    "IFCELECTRICALELEMENT",
    "IFCELEMENTASSEMBLY",
    "IFCEQUIPMENTELEMENT",
    "IFCFURNISHINGELEMENT",
    "IFCFURNITURE",
    "IFCGEOGRAPHICELEMENT",
    "IFCSYSTEMFURNITUREELEMENT",
    "IFCTRANSPORTELEMENT",
    "IFCVIRTUALELEMENT",
];

/// Classify an IFC type name (case-insensitive).
pub fn classify(type_name: &str) -> ObjectClass {
    let upper = type_name.to_ascii_uppercase();
    if GROUP_TYPES.contains(&upper.as_str()) {
        ObjectClass::Group
    } else if ELEMENT_TYPES.contains(&upper.as_str()) {
        ObjectClass::Element
    } else {
        ObjectClass::Other
    }
}

/// Whether a type name denotes a type object carrying `HasPropertySets`.
pub(crate) fn is_type_object(type_name: &str) -> bool {
    let upper = type_name.to_ascii_uppercase();
    upper.starts_with("IFC") && (upper.ends_with("TYPE") || upper.ends_with("STYLE"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("IFCWALL"), ObjectClass::Element);
        assert_eq!(classify("IfcWallStandardCase"), ObjectClass::Element);
        assert_eq!(classify("IFCOPENINGELEMENT"), ObjectClass::Element);
        assert_eq!(classify("IFCGROUP"), ObjectClass::Group);
        assert_eq!(classify("IFCZONE"), ObjectClass::Group);
        assert_eq!(classify("IFCBUILDINGSTOREY"), ObjectClass::Other);
        assert_eq!(classify("IFCPROPERTYSET"), ObjectClass::Other);
    }

    #[test]
    fn test_type_objects() {
        assert!(is_type_object("IFCWALLTYPE"));
        assert!(is_type_object("IFCDOORSTYLE"));
        assert!(!is_type_object("IFCWALL"));
    }
}
