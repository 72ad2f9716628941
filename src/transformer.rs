use crate::ast::*;
use crate::cache::ReferenceCache;
use crate::error::TreeError;
use crate::registry::{Definition, DefinitionKind, DefinitionRegistry, DefinitionValue, Target};
use crate::tree::{Node, NodeKind, ParseTree};
use std::iter::Peekable;
use std::slice::Iter;

/// Folds a parse tree into a [`BelDocument`], routing declarations into the
/// registry and every namespace/annotation entry into the reference cache.
pub struct Transformer<'a> {
    registry: &'a mut DefinitionRegistry,
    cache: &'a mut ReferenceCache,
}

impl<'a> Transformer<'a> {
    pub fn new(registry: &'a mut DefinitionRegistry, cache: &'a mut ReferenceCache) -> Self {
        Self { registry, cache }
    }

    pub fn transform(&mut self, tree: &ParseTree) -> Result<BelDocument, TreeError> {
        if tree.root.kind != NodeKind::Script {
            return Err(unexpected(&tree.root, "the tree root"));
        }
        let mut document = BelDocument::default();
        for line in &tree.root.children {
            self.transform_line(line, &mut document)?;
        }
        log::debug!(
            "transformed {} lines, {} definitions",
            document.statements_and_sets.len(),
            document.definitions.len()
        );
        Ok(document)
    }

    fn transform_line(&mut self, node: &Node, document: &mut BelDocument) -> Result<(), TreeError> {
        let item = match &node.kind {
            NodeKind::DocumentProperty(key) => {
                let value = child(node, 0, "document property", "value")?;
                document.document.insert(*key, value.text.clone());
                return Ok(());
            }
            NodeKind::Definition(target, kind) => {
                let definition = self.definition(node, *target, *kind)?;
                self.registry.add(definition.clone());
                document.definitions.push(definition);
                return Ok(());
            }
            NodeKind::Citation => ScriptItem::Citation(citation(node)),
            NodeKind::Support => {
                ScriptItem::Support(child(node, 0, "support", "text")?.text.clone())
            }
            NodeKind::StatementGroup => {
                ScriptItem::StatementGroup(child(node, 0, "statement group", "name")?.text.clone())
            }
            NodeKind::AnnotationSet => ScriptItem::Set(self.annotation_set(node)?),
            NodeKind::Unset => ScriptItem::Unset(Unset::Keywords(
                node.children.iter().map(|k| k.text.clone()).collect(),
            )),
            NodeKind::UnsetAll => ScriptItem::Unset(Unset::All),
            NodeKind::UnsetStatementGroup => ScriptItem::Unset(Unset::StatementGroup),
            NodeKind::Statement => ScriptItem::Statement(self.statement(node)?),
            NodeKind::Script
            | NodeKind::ListValue
            | NodeKind::Term(_)
            | NodeKind::NamespacedName
            | NodeKind::Relation(_)
            | NodeKind::Keyword
            | NodeKind::Value
            | NodeKind::Comment => return Err(unexpected(node, "a script line")),
        };
        document.statements_and_sets.push(item);
        Ok(())
    }

    fn definition(
        &mut self,
        node: &Node,
        target: Target,
        kind: DefinitionKind,
    ) -> Result<Definition, TreeError> {
        let keyword = child(node, 0, "definition", "keyword")?.text.clone();
        let value = child(node, 1, "definition", "value")?;
        let value = match kind {
            DefinitionKind::Url => DefinitionValue::Url(value.text.clone()),
            DefinitionKind::File => DefinitionValue::File(value.text.clone()),
            DefinitionKind::Pattern => DefinitionValue::Pattern(value.text.clone()),
            DefinitionKind::List => {
                DefinitionValue::List(value.children.iter().map(|v| v.text.clone()).collect())
            }
        };
        Ok(Definition {
            target,
            keyword,
            value,
        })
    }

    fn annotation_set(&mut self, node: &Node) -> Result<AnnotationSet, TreeError> {
        let keyword = child(node, 0, "annotation set", "keyword")?.text.clone();
        let mut entries = Vec::with_capacity(node.children.len().saturating_sub(1));
        for value in node.children.iter().skip(1) {
            self.cache
                .record(Target::Annotation, &keyword, &value.text, value.position());
            entries.push(value.text.clone());
        }
        if entries.is_empty() {
            return Err(TreeError::MissingChild {
                context: "annotation set",
                part: "value",
            });
        }
        entries.sort();
        Ok(AnnotationSet { keyword, entries })
    }

    fn statement(&mut self, node: &Node) -> Result<Statement, TreeError> {
        let mut children = node.children.iter();
        let subject = match children.next() {
            Some(subject) => self.term(subject)?,
            None => {
                return Err(TreeError::MissingChild {
                    context: "statement",
                    part: "subject",
                })
            }
        };
        let mut statement = Statement {
            subject,
            relation: None,
            object: None,
            comment: None,
        };
        for part in children {
            match &part.kind {
                NodeKind::Relation(relation) => statement.relation = Some(*relation),
                NodeKind::Term(_) => statement.object = Some(Object::Term(self.term(part)?)),
                NodeKind::Statement => {
                    statement.object = Some(Object::Statement(Box::new(self.statement(part)?)))
                }
                NodeKind::Comment => statement.comment = Some(part.text.clone()),
                NodeKind::Script
                | NodeKind::DocumentProperty(_)
                | NodeKind::Definition(..)
                | NodeKind::ListValue
                | NodeKind::Citation
                | NodeKind::Support
                | NodeKind::StatementGroup
                | NodeKind::AnnotationSet
                | NodeKind::Unset
                | NodeKind::UnsetAll
                | NodeKind::UnsetStatementGroup
                | NodeKind::NamespacedName
                | NodeKind::Keyword
                | NodeKind::Value => return Err(unexpected(part, "a statement")),
            }
        }
        Ok(statement)
    }

    fn term(&mut self, node: &Node) -> Result<Term, TreeError> {
        let NodeKind::Term(function) = node.kind else {
            return Err(unexpected(node, "a term position"));
        };
        let mut arguments = Vec::with_capacity(node.children.len());
        for argument in &node.children {
            arguments.push(self.argument(argument)?);
        }
        if matches!(
            function,
            Function::ComplexAbundance
                | Function::CompositeAbundance
                | Function::Reactants
                | Function::Products
                | Function::List
        ) {
            arguments.sort();
        }
        Ok(Term {
            function,
            arguments,
        })
    }

    fn argument(&mut self, node: &Node) -> Result<Argument, TreeError> {
        match &node.kind {
            NodeKind::NamespacedName => Ok(Argument::Name(self.name(node)?)),
            NodeKind::Term(function) if function.category() == FunctionCategory::Modifier => {
                Ok(Argument::Modifier(self.modifier(*function, node)?))
            }
            NodeKind::Term(_) => Ok(Argument::Term(self.term(node)?)),
            NodeKind::Value => Ok(Argument::Value(node.text.clone())),
            NodeKind::Script
            | NodeKind::DocumentProperty(_)
            | NodeKind::Definition(..)
            | NodeKind::ListValue
            | NodeKind::Citation
            | NodeKind::Support
            | NodeKind::StatementGroup
            | NodeKind::AnnotationSet
            | NodeKind::Unset
            | NodeKind::UnsetAll
            | NodeKind::UnsetStatementGroup
            | NodeKind::Statement
            | NodeKind::Relation(_)
            | NodeKind::Keyword
            | NodeKind::Comment => Err(unexpected(node, "a function argument")),
        }
    }

    /// Resolves `KEYWORD:entry` and records the entry's position.
    fn name(&mut self, node: &Node) -> Result<NamespacedName, TreeError> {
        if node.kind != NodeKind::NamespacedName {
            return Err(unexpected(node, "a KEYWORD:entry position"));
        }
        let keyword = child(node, 0, "namespaced name", "keyword")?;
        let entry = child(node, 1, "namespaced name", "entry")?;
        self.cache.record(
            Target::Namespace,
            &keyword.text,
            &entry.text,
            entry.position(),
        );
        Ok(NamespacedName {
            namespace: keyword.text.clone(),
            name: entry.text.clone(),
        })
    }

    /// A name that may also be given as a bare value, e.g. `ma(kin)` or `pmod(Ph)`.
    fn name_or_value(&mut self, node: &Node) -> Result<Result<NamespacedName, String>, TreeError> {
        match node.kind {
            NodeKind::NamespacedName => Ok(Ok(self.name(node)?)),
            NodeKind::Value => Ok(Err(node.text.clone())),
            NodeKind::Script
            | NodeKind::DocumentProperty(_)
            | NodeKind::Definition(..)
            | NodeKind::ListValue
            | NodeKind::Citation
            | NodeKind::Support
            | NodeKind::StatementGroup
            | NodeKind::AnnotationSet
            | NodeKind::Unset
            | NodeKind::UnsetAll
            | NodeKind::UnsetStatementGroup
            | NodeKind::Statement
            | NodeKind::Term(_)
            | NodeKind::Relation(_)
            | NodeKind::Keyword
            | NodeKind::Comment => Err(unexpected(node, "a name or value")),
        }
    }

    fn modifier(&mut self, function: Function, node: &Node) -> Result<Modifier, TreeError> {
        let args = &node.children;
        let text = |index: usize| args.get(index).map(|n| n.text.clone()).unwrap_or_default();

        let modifier = match function {
            Function::ProteinModification => {
                let first = child(node, 0, "pmod", "modification type")?;
                let (namespace, name, modification_type) = match self.name_or_value(first)? {
                    Ok(name) => (name.namespace, name.name, String::new()),
                    Err(value) => (String::new(), String::new(), value),
                };
                Modifier::ProteinModification {
                    namespace,
                    name,
                    modification_type,
                    amino_acid: text(1),
                    position: match args.get(2) {
                        Some(position) => position.text.parse::<ResiduePosition>().map_err(
                            |_| TreeError::InvalidValue {
                                context: "pmod",
                                part: "position",
                                found: position.text.clone(),
                            },
                        )?,
                        None => 0,
                    },
                }
            }
            Function::GeneModification => {
                let first = child(node, 0, "gmod", "modification")?;
                let (namespace, name) = match self.name_or_value(first)? {
                    Ok(name) => (name.namespace, name.name),
                    Err(value) => (String::new(), value),
                };
                Modifier::GeneModification { namespace, name }
            }
            Function::MolecularActivity => {
                let first = child(node, 0, "ma", "activity")?;
                match self.name_or_value(first)? {
                    Ok(name) => Modifier::MolecularActivity {
                        namespace: name.namespace,
                        name: name.name,
                        default: String::new(),
                    },
                    Err(value) => Modifier::MolecularActivity {
                        namespace: String::new(),
                        name: String::new(),
                        default: value,
                    },
                }
            }
            Function::Variant => Modifier::Variant { hgvs: text(0) },
            Function::Fragment => Modifier::Fragment {
                range: text(0),
                descriptor: text(1),
            },
            Function::Location => {
                Modifier::Location(self.name(child(node, 0, "loc", "location")?)?)
            }
            Function::FromLocation => {
                Modifier::FromLocation(self.name(child(node, 0, "fromLoc", "location")?)?)
            }
            Function::ToLocation => {
                Modifier::ToLocation(self.name(child(node, 0, "toLoc", "location")?)?)
            }
            Function::Fusion => self.fusion(node)?,
            Function::Abundance
            | Function::GeneAbundance
            | Function::RnaAbundance
            | Function::MicroRnaAbundance
            | Function::ProteinAbundance
            | Function::PopulationAbundance
            | Function::ComplexAbundance
            | Function::CompositeAbundance
            | Function::BiologicalProcess
            | Function::Pathology
            | Function::Activity
            | Function::Degradation
            | Function::Translocation
            | Function::CellSecretion
            | Function::CellSurfaceExpression
            | Function::Reaction
            | Function::Reactants
            | Function::Products
            | Function::List => return Err(unexpected(node, function.long_name())),
        };
        Ok(modifier)
    }

    /// fus(Name [range], Name [range]); missing ranges become `?`.
    fn fusion(&mut self, node: &Node) -> Result<Modifier, TreeError> {
        let mut parts = node.children.iter().peekable();
        let (partner_5prime, range_5prime) = self.fusion_partner(&mut parts, "5' partner")?;
        let (partner_3prime, range_3prime) = self.fusion_partner(&mut parts, "3' partner")?;
        Ok(Modifier::Fusion {
            partner_5prime,
            range_5prime,
            partner_3prime,
            range_3prime,
        })
    }

    fn fusion_partner(
        &mut self,
        parts: &mut Peekable<Iter<'_, Node>>,
        part: &'static str,
    ) -> Result<(NamespacedName, String), TreeError> {
        let name = match parts.next() {
            Some(name) => self.name(name)?,
            None => {
                return Err(TreeError::MissingChild {
                    context: "fus",
                    part,
                })
            }
        };
        let range = match parts.next_if(|range| range.kind == NodeKind::Value) {
            Some(range) => range.text.clone(),
            None => "?".to_string(),
        };
        Ok((name, range))
    }
}

fn citation(node: &Node) -> Citation {
    let values: Vec<String> = node.children.iter().map(|v| v.text.clone()).collect();
    let at = |index: usize| values.get(index).cloned().unwrap_or_default();
    // two fields are {type, reference}; otherwise the full positional form
    if values.len() == 2 {
        Citation {
            citation_type: at(0),
            title: String::new(),
            reference: at(1),
            pub_date: String::new(),
            authors: String::new(),
            comment: String::new(),
        }
    } else {
        Citation {
            citation_type: at(0),
            title: at(1),
            reference: at(2),
            pub_date: at(3),
            authors: at(4),
            comment: at(5),
        }
    }
}

fn child<'n>(
    node: &'n Node,
    index: usize,
    context: &'static str,
    part: &'static str,
) -> Result<&'n Node, TreeError> {
    node.child(index)
        .ok_or(TreeError::MissingChild { context, part })
}

fn unexpected(node: &Node, context: &'static str) -> TreeError {
    TreeError::UnexpectedNode {
        found: node.kind.describe(),
        context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Position;
    use crate::parser::Parser;

    fn transform(source: &str) -> (BelDocument, DefinitionRegistry, ReferenceCache) {
        let tree = Parser::new(source).parse_script().unwrap();
        let mut registry = DefinitionRegistry::new();
        let mut cache = ReferenceCache::new();
        let document = Transformer::new(&mut registry, &mut cache)
            .transform(&tree)
            .unwrap();
        (document, registry, cache)
    }

    fn first_statement(document: &BelDocument) -> &Statement {
        document.statements().next().unwrap()
    }

    #[test]
    fn test_every_name_is_recorded_with_its_position() {
        let source = "p(HGNC:TNF) -> p(HGNC:AKT1, loc(GO:cytoplasm))\nr(HGNC:TNF)\n";
        let (_, _, cache) = transform(source);

        assert_eq!(
            cache.occurrences_of(Target::Namespace, "HGNC", "TNF"),
            &[Position::new(1, 8), Position::new(2, 8)]
        );
        assert_eq!(
            cache.occurrences_of(Target::Namespace, "GO", "cytoplasm"),
            &[Position::new(1, 36)]
        );
    }

    #[test]
    fn test_annotation_sets_are_recorded_and_sorted() {
        let (document, _, cache) = transform("SET Cell = {\"T cell\", \"B cell\"}\n");
        match &document.statements_and_sets[0] {
            ScriptItem::Set(set) => {
                assert_eq!(set.keyword, "Cell");
                assert_eq!(set.entries, vec!["B cell", "T cell"]);
            }
            other => panic!("expected a set, got {other:?}"),
        }
        assert_eq!(
            cache.occurrences_of(Target::Annotation, "Cell", "T cell"),
            &[Position::new(1, 13)]
        );
    }

    #[test]
    fn test_definitions_go_to_the_registry() {
        let source = "DEFINE NAMESPACE HGNC AS URL \"http://x/hgnc.belns\"\nDEFINE ANNOTATION Dir AS LIST {\"up\", \"down\", \"up\"}\n";
        let (document, registry, _) = transform(source);
        assert_eq!(document.definitions.len(), 2);
        assert_eq!(
            registry.get(Target::Namespace, "HGNC").unwrap().value,
            DefinitionValue::Url("http://x/hgnc.belns".to_string())
        );
        match &registry.get(Target::Annotation, "Dir").unwrap().value {
            DefinitionValue::List(values) => assert_eq!(values.len(), 2),
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn test_protein_modification_defaults() {
        let (document, _, _) = transform("p(HGNC:AKT1, pmod(Ph))");
        let modifier = &first_statement(&document).subject.arguments[1];
        assert_eq!(
            modifier,
            &Argument::Modifier(Modifier::ProteinModification {
                namespace: String::new(),
                name: String::new(),
                modification_type: "Ph".to_string(),
                amino_acid: String::new(),
                position: 0,
            })
        );
    }

    #[test]
    fn test_namespaced_protein_modification() {
        let (document, _, cache) = transform("p(HGNC:AKT1, pmod(MOD:Ph, Ser, 473))");
        let modifier = &first_statement(&document).subject.arguments[1];
        assert_eq!(
            modifier,
            &Argument::Modifier(Modifier::ProteinModification {
                namespace: "MOD".to_string(),
                name: "Ph".to_string(),
                modification_type: String::new(),
                amino_acid: "Ser".to_string(),
                position: 473,
            })
        );
        assert_eq!(cache.occurrences_of(Target::Namespace, "MOD", "Ph").len(), 1);
    }

    #[test]
    fn test_fusion_ranges_default_to_question_mark() {
        let (document, _, cache) = transform("r(fus(HGNC:TMPRSS2, HGNC:ERG, \"r.312_5034\"))");
        match &first_statement(&document).subject.arguments[0] {
            Argument::Modifier(Modifier::Fusion {
                range_5prime,
                range_3prime,
                partner_3prime,
                ..
            }) => {
                assert_eq!(range_5prime, "?");
                assert_eq!(range_3prime, "r.312_5034");
                assert_eq!(partner_3prime.name, "ERG");
            }
            other => panic!("expected a fusion, got {other:?}"),
        }
        assert_eq!(cache.entries(Target::Namespace, "HGNC").count(), 2);
    }

    #[test]
    fn test_complex_members_are_sorted() {
        let (document, _, _) = transform("complex(p(HGNC:B), p(HGNC:A))");
        let names: Vec<&str> = first_statement(&document)
            .subject
            .arguments
            .iter()
            .map(|argument| match argument {
                Argument::Term(term) => term.name().unwrap().name.as_str(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_citation_forms() {
        let (document, _, _) = transform(
            "SET Citation = {\"PubMed\", \"12345\"}\nSET Citation = {\"PubMed\", \"Title\", \"678\", \"2001\"}\n",
        );
        let citations: Vec<&Citation> = document
            .statements_and_sets
            .iter()
            .filter_map(|item| match item {
                ScriptItem::Citation(citation) => Some(citation),
                _ => None,
            })
            .collect();
        assert_eq!(citations[0].reference, "12345");
        assert_eq!(citations[0].title, "");
        assert_eq!(citations[1].title, "Title");
        assert_eq!(citations[1].reference, "678");
        assert_eq!(citations[1].pub_date, "2001");
        assert_eq!(citations[1].authors, "");
    }

    #[test]
    fn test_nested_statement_and_comment() {
        let (document, _, cache) =
            transform("p(HGNC:A) -> (p(HGNC:B) -| bp(GO:x)) // note\nSET DOCUMENT Name = \"Doc\"\n");
        let statement = first_statement(&document);
        assert_eq!(statement.relation, Some(Relation::Increases));
        assert_eq!(statement.comment.as_deref(), Some("note"));
        assert!(matches!(statement.object, Some(Object::Statement(_))));
        assert_eq!(document.document[&DocumentKey::Name], "Doc");
        assert_eq!(cache.keywords(Target::Namespace).count(), 2);
    }

    #[test]
    fn test_unexpected_root_is_rejected() {
        let tree = ParseTree {
            root: Node::new(NodeKind::Keyword, 1, 1, 0),
        };
        let mut registry = DefinitionRegistry::new();
        let mut cache = ReferenceCache::new();
        let err = Transformer::new(&mut registry, &mut cache)
            .transform(&tree)
            .unwrap_err();
        assert!(matches!(err, TreeError::UnexpectedNode { .. }));
    }

    fn find_value<'n>(node: &'n mut Node, text: &str) -> Option<&'n mut Node> {
        if node.kind == NodeKind::Value && node.text == text {
            return Some(node);
        }
        node.children
            .iter_mut()
            .find_map(|child| find_value(child, text))
    }

    #[test]
    fn test_unreadable_pmod_position_is_an_error() {
        let mut tree = Parser::new("p(HGNC:AKT1, pmod(Ph, Ser, 473))")
            .parse_script()
            .unwrap();
        find_value(&mut tree.root, "473").unwrap().text = "4294967296".to_string();

        let mut registry = DefinitionRegistry::new();
        let mut cache = ReferenceCache::new();
        let err = Transformer::new(&mut registry, &mut cache)
            .transform(&tree)
            .unwrap_err();
        assert!(matches!(
            err,
            TreeError::InvalidValue {
                context: "pmod",
                part: "position",
                ..
            }
        ));
    }

    #[test]
    fn test_definition_inside_a_statement_is_rejected() {
        let mut tree = Parser::new("p(HGNC:A) -> p(HGNC:B)").parse_script().unwrap();
        let stray = Node::new(NodeKind::ListValue, 1, 1, 0);
        tree.root.children[0].children.push(stray);

        let mut registry = DefinitionRegistry::new();
        let mut cache = ReferenceCache::new();
        let err = Transformer::new(&mut registry, &mut cache)
            .transform(&tree)
            .unwrap_err();
        assert!(matches!(
            err,
            TreeError::UnexpectedNode {
                context: "a statement",
                ..
            }
        ));
    }
}
