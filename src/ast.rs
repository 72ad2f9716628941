use crate::registry::Definition;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// A fully transformed BEL script.
#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct BelDocument {
    /// `SET DOCUMENT <Key> = <value>` properties.
    pub document: BTreeMap<DocumentKey, String>,
    /// Namespace and annotation declarations, in script order.
    pub definitions: Vec<Definition>,
    pub statements_and_sets: Vec<ScriptItem>,
}

impl BelDocument {
    /// Iterates the statements of the script, skipping set/unset lines.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.statements_and_sets.iter().filter_map(|item| match item {
            ScriptItem::Statement(statement) => Some(statement),
            _ => None,
        })
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKey {
    Name,
    Description,
    Version,
    Authors,
    ContactInfo,
    Copyright,
    Licenses,
    Keywords,
}

impl DocumentKey {
    pub const ALL: [DocumentKey; 8] = [
        DocumentKey::Name,
        DocumentKey::Description,
        DocumentKey::Version,
        DocumentKey::Authors,
        DocumentKey::ContactInfo,
        DocumentKey::Copyright,
        DocumentKey::Licenses,
        DocumentKey::Keywords,
    ];

    pub fn script_name(self) -> &'static str {
        match self {
            DocumentKey::Name => "Name",
            DocumentKey::Description => "Description",
            DocumentKey::Version => "Version",
            DocumentKey::Authors => "Authors",
            DocumentKey::ContactInfo => "ContactInfo",
            DocumentKey::Copyright => "Copyright",
            DocumentKey::Licenses => "Licenses",
            DocumentKey::Keywords => "Keywords",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        if name == "Licences" {
            return Some(DocumentKey::Licenses);
        }
        Self::ALL.into_iter().find(|key| key.script_name() == name)
    }
}

/// One line of the script body.
#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptItem {
    Statement(Statement),
    Citation(Citation),
    /// Evidence text (`SET Support`, `SET Evidence`, `SET SupportingText`).
    Support(String),
    StatementGroup(String),
    Set(AnnotationSet),
    Unset(Unset),
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Citation {
    #[serde(rename = "type")]
    pub citation_type: String,
    pub title: String,
    pub reference: String,
    pub pub_date: String,
    pub authors: String,
    pub comment: String,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct AnnotationSet {
    pub keyword: String,
    /// Sorted entry values.
    pub entries: Vec<String>,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unset {
    Keywords(Vec<String>),
    StatementGroup,
    All,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Serialize)]
pub struct Statement {
    pub subject: Term,
    pub relation: Option<Relation>,
    pub object: Option<Object>,
    pub comment: Option<String>,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Object {
    Term(Term),
    Statement(Box<Statement>),
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Serialize)]
pub struct Term {
    pub function: Function,
    pub arguments: Vec<Argument>,
}

impl Term {
    /// The first namespace-qualified name among the arguments, if any.
    pub fn name(&self) -> Option<&NamespacedName> {
        self.arguments.iter().find_map(|argument| match argument {
            Argument::Name(name) => Some(name),
            _ => None,
        })
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    Name(NamespacedName),
    Term(Term),
    Modifier(Modifier),
    /// A bare value outside a modifier, e.g. the argument of a stand-alone `ma(kin)`.
    Value(String),
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl Display for NamespacedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:\"{}\"", self.namespace, self.name)
    }
}

/// Residue position of a protein modification. The parser accepts exactly
/// the numbers this type can hold.
pub type ResiduePosition = u32;

/// Modifier functions. Optional parts are always present, holding an empty
/// string (or 0 for positions) when the script leaves them out.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    ProteinModification {
        namespace: String,
        name: String,
        modification_type: String,
        amino_acid: String,
        position: ResiduePosition,
    },
    GeneModification {
        namespace: String,
        name: String,
    },
    Variant {
        hgvs: String,
    },
    Fragment {
        range: String,
        descriptor: String,
    },
    Location(NamespacedName),
    FromLocation(NamespacedName),
    ToLocation(NamespacedName),
    MolecularActivity {
        namespace: String,
        name: String,
        default: String,
    },
    Fusion {
        partner_5prime: NamespacedName,
        range_5prime: String,
        partner_3prime: NamespacedName,
        range_3prime: String,
    },
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCategory {
    Abundance,
    List,
    Process,
    Transformation,
    ReactionPartner,
    Modifier,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    Abundance,
    GeneAbundance,
    RnaAbundance,
    MicroRnaAbundance,
    ProteinAbundance,
    PopulationAbundance,
    ComplexAbundance,
    CompositeAbundance,
    BiologicalProcess,
    Pathology,
    Activity,
    MolecularActivity,
    Degradation,
    Translocation,
    CellSecretion,
    CellSurfaceExpression,
    Reaction,
    Reactants,
    Products,
    FromLocation,
    ToLocation,
    Location,
    Fragment,
    Variant,
    ProteinModification,
    GeneModification,
    Fusion,
    List,
}

impl Function {
    pub const ALL: [Function; 28] = [
        Function::Abundance,
        Function::GeneAbundance,
        Function::RnaAbundance,
        Function::MicroRnaAbundance,
        Function::ProteinAbundance,
        Function::PopulationAbundance,
        Function::ComplexAbundance,
        Function::CompositeAbundance,
        Function::BiologicalProcess,
        Function::Pathology,
        Function::Activity,
        Function::MolecularActivity,
        Function::Degradation,
        Function::Translocation,
        Function::CellSecretion,
        Function::CellSurfaceExpression,
        Function::Reaction,
        Function::Reactants,
        Function::Products,
        Function::FromLocation,
        Function::ToLocation,
        Function::Location,
        Function::Fragment,
        Function::Variant,
        Function::ProteinModification,
        Function::GeneModification,
        Function::Fusion,
        Function::List,
    ];

    pub fn long_name(self) -> &'static str {
        match self {
            Function::Abundance => "abundance",
            Function::GeneAbundance => "geneAbundance",
            Function::RnaAbundance => "rnaAbundance",
            Function::MicroRnaAbundance => "microRNAAbundance",
            Function::ProteinAbundance => "proteinAbundance",
            Function::PopulationAbundance => "populationAbundance",
            Function::ComplexAbundance => "complexAbundance",
            Function::CompositeAbundance => "compositeAbundance",
            Function::BiologicalProcess => "biologicalProcess",
            Function::Pathology => "pathology",
            Function::Activity => "activity",
            Function::MolecularActivity => "molecularActivity",
            Function::Degradation => "degradation",
            Function::Translocation => "translocation",
            Function::CellSecretion => "cellSecretion",
            Function::CellSurfaceExpression => "cellSurfaceExpression",
            Function::Reaction => "reaction",
            Function::Reactants => "reactants",
            Function::Products => "products",
            Function::FromLocation => "fromLocation",
            Function::ToLocation => "toLocation",
            Function::Location => "location",
            Function::Fragment => "fragment",
            Function::Variant => "variant",
            Function::ProteinModification => "proteinModification",
            Function::GeneModification => "geneModification",
            Function::Fusion => "fusion",
            Function::List => "list",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Function::Abundance => "a",
            Function::GeneAbundance => "g",
            Function::RnaAbundance => "r",
            Function::MicroRnaAbundance => "m",
            Function::ProteinAbundance => "p",
            Function::PopulationAbundance => "pop",
            Function::ComplexAbundance => "complex",
            Function::CompositeAbundance => "composite",
            Function::BiologicalProcess => "bp",
            Function::Pathology => "path",
            Function::Activity => "act",
            Function::MolecularActivity => "ma",
            Function::Degradation => "deg",
            Function::Translocation => "tloc",
            Function::CellSecretion => "sec",
            Function::CellSurfaceExpression => "surf",
            Function::Reaction => "rxn",
            Function::Reactants => "reactants",
            Function::Products => "products",
            Function::FromLocation => "fromLoc",
            Function::ToLocation => "toLoc",
            Function::Location => "loc",
            Function::Fragment => "frag",
            Function::Variant => "var",
            Function::ProteinModification => "pmod",
            Function::GeneModification => "gmod",
            Function::Fusion => "fus",
            Function::List => "list",
        }
    }

    /// Looks a function up by its long or short name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.long_name() == name || f.short_name() == name)
    }

    pub fn category(self) -> FunctionCategory {
        match self {
            Function::Abundance
            | Function::GeneAbundance
            | Function::RnaAbundance
            | Function::MicroRnaAbundance
            | Function::ProteinAbundance
            | Function::PopulationAbundance
            | Function::ComplexAbundance => FunctionCategory::Abundance,
            Function::CompositeAbundance | Function::List => FunctionCategory::List,
            Function::BiologicalProcess | Function::Pathology | Function::Activity => {
                FunctionCategory::Process
            }
            Function::Degradation
            | Function::Translocation
            | Function::CellSecretion
            | Function::CellSurfaceExpression
            | Function::Reaction => FunctionCategory::Transformation,
            Function::Reactants | Function::Products => FunctionCategory::ReactionPartner,
            Function::MolecularActivity
            | Function::FromLocation
            | Function::ToLocation
            | Function::Location
            | Function::Fragment
            | Function::Variant
            | Function::ProteinModification
            | Function::GeneModification
            | Function::Fusion => FunctionCategory::Modifier,
        }
    }

    /// Every accepted spelling, used in syntax error hints.
    pub fn names() -> Vec<String> {
        let mut names: Vec<String> = Self::ALL
            .iter()
            .flat_map(|f| [f.long_name(), f.short_name()])
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Increases,
    Decreases,
    DirectlyIncreases,
    DirectlyDecreases,
    CausesNoChange,
    Regulates,
    Association,
    PositiveCorrelation,
    NegativeCorrelation,
    NoCorrelation,
    Correlation,
    Binds,
    IsA,
    HasComponent,
    HasComponents,
    HasMember,
    HasMembers,
    SubProcessOf,
    RateLimitingStepOf,
    BiomarkerFor,
    PrognosticBiomarkerFor,
    TranscribedTo,
    TranslatedTo,
    Orthologous,
    AnalogousTo,
    HasVariant,
    HasModification,
    HasProduct,
    HasReactant,
    HasActivity,
}

impl Relation {
    pub const ALL: [Relation; 30] = [
        Relation::Increases,
        Relation::Decreases,
        Relation::DirectlyIncreases,
        Relation::DirectlyDecreases,
        Relation::CausesNoChange,
        Relation::Regulates,
        Relation::Association,
        Relation::PositiveCorrelation,
        Relation::NegativeCorrelation,
        Relation::NoCorrelation,
        Relation::Correlation,
        Relation::Binds,
        Relation::IsA,
        Relation::HasComponent,
        Relation::HasComponents,
        Relation::HasMember,
        Relation::HasMembers,
        Relation::SubProcessOf,
        Relation::RateLimitingStepOf,
        Relation::BiomarkerFor,
        Relation::PrognosticBiomarkerFor,
        Relation::TranscribedTo,
        Relation::TranslatedTo,
        Relation::Orthologous,
        Relation::AnalogousTo,
        Relation::HasVariant,
        Relation::HasModification,
        Relation::HasProduct,
        Relation::HasReactant,
        Relation::HasActivity,
    ];

    pub fn long_name(self) -> &'static str {
        match self {
            Relation::Increases => "increases",
            Relation::Decreases => "decreases",
            Relation::DirectlyIncreases => "directlyIncreases",
            Relation::DirectlyDecreases => "directlyDecreases",
            Relation::CausesNoChange => "causesNoChange",
            Relation::Regulates => "regulates",
            Relation::Association => "association",
            Relation::PositiveCorrelation => "positiveCorrelation",
            Relation::NegativeCorrelation => "negativeCorrelation",
            Relation::NoCorrelation => "noCorrelation",
            Relation::Correlation => "correlation",
            Relation::Binds => "binds",
            Relation::IsA => "isA",
            Relation::HasComponent => "hasComponent",
            Relation::HasComponents => "hasComponents",
            Relation::HasMember => "hasMember",
            Relation::HasMembers => "hasMembers",
            Relation::SubProcessOf => "subProcessOf",
            Relation::RateLimitingStepOf => "rateLimitingStepOf",
            Relation::BiomarkerFor => "biomarkerFor",
            Relation::PrognosticBiomarkerFor => "prognosticBiomarkerFor",
            Relation::TranscribedTo => "transcribedTo",
            Relation::TranslatedTo => "translatedTo",
            Relation::Orthologous => "orthologous",
            Relation::AnalogousTo => "analogousTo",
            Relation::HasVariant => "hasVariant",
            Relation::HasModification => "hasModification",
            Relation::HasProduct => "hasProduct",
            Relation::HasReactant => "hasReactant",
            Relation::HasActivity => "hasActivity",
        }
    }

    /// The abbreviated spelling, when BEL defines one.
    pub fn short_name(self) -> Option<&'static str> {
        match self {
            Relation::Increases => Some("->"),
            Relation::Decreases => Some("-|"),
            Relation::DirectlyIncreases => Some("=>"),
            Relation::DirectlyDecreases => Some("=|"),
            Relation::CausesNoChange => Some("cnc"),
            Relation::Regulates => Some("reg"),
            Relation::Association => Some("--"),
            Relation::PositiveCorrelation => Some("pos"),
            Relation::NegativeCorrelation => Some("neg"),
            Relation::TranscribedTo => Some(":>"),
            Relation::TranslatedTo => Some(">>"),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.long_name() == name || r.short_name() == Some(name))
    }

    pub fn names() -> Vec<String> {
        Self::ALL
            .iter()
            .flat_map(|r| std::iter::once(r.long_name()).chain(r.short_name()))
            .map(str::to_string)
            .collect()
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.long_name())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.long_name())
    }
}
