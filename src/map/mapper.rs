use crate::error::{ConfigError, MapResult, NodeKind};
use crate::map::keys::{ParentLink, PrimaryKey};
use crate::map::spec::{MappingNode, MappingSpec, NodeSet, TableNode};
use crate::map::table::{Row, Table, TableRegistry};
use crate::map::types::{MapperConfig, UserData};
use crate::map::value::{coerce, is_empty, locate, resolve_user_data};
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Maps decoded documents into flat relational tables according to a [`MappingSpec`]
pub struct Mapper {
    spec: MappingSpec,
    config: MapperConfig,
    registry: TableRegistry,
    /// Mapping that produces each destination, reused by table nodes without their own
    owners: HashMap<String, Rc<NodeSet>>,
}

/// A node's contribution to the row being built, in declaration order
enum Slot<'n> {
    Column { destination: &'n str, value: String },
    Table { key: &'n str, node: &'n TableNode },
}

impl Mapper {
    pub fn new(spec: MappingSpec, config: MapperConfig) -> Self {
        let mut owners = HashMap::new();
        owners.insert(config.root_destination.clone(), Rc::clone(spec.root()));

        Mapper {
            spec,
            config,
            registry: TableRegistry::new(),
            owners,
        }
    }

    /// Build a mapper straight from a JSON mapping configuration
    pub fn from_config(mapping: Value, config: MapperConfig) -> MapResult<Self> {
        Ok(Self::new(MappingSpec::compile(mapping)?, config))
    }

    /// Map every record into rows, accumulating them into this mapper's tables.
    ///
    /// On error the call stops immediately. Rows appended by earlier records
    /// stay in the registry.
    pub fn parse(&mut self, records: &[Value], user_data: &UserData) -> MapResult<()> {
        let root = Rc::clone(self.spec.root());
        let destination = self.config.root_destination.clone();
        self.registry.get_or_create(&destination);

        for record in records {
            self.map_row(&root, &destination, record, None, user_data)?;
        }

        debug!(
            records = records.len(),
            tables = self.registry.len(),
            "parse complete"
        );
        Ok(())
    }

    /// Recursively map one element into a row of `destination`, descending into table nodes
    fn map_row(
        &mut self,
        nodes: &Rc<NodeSet>,
        destination: &str,
        item: &Value,
        link: Option<&ParentLink>,
        user_data: &UserData,
    ) -> MapResult<()> {
        let mut slots = Vec::with_capacity(nodes.len());
        let mut declared_key = Vec::new();

        // Columns and injected values first, so the key exists before any child needs it
        for index in 0..nodes.len() {
            let (key, node) = nodes.node(index)?;
            match node {
                MappingNode::Column(column) => {
                    let value = coerce(
                        locate(item, &column.path),
                        column.force_type,
                        &column.destination,
                    )?;
                    if column.primary_key {
                        declared_key.push(column.destination.clone());
                    }
                    slots.push(Slot::Column {
                        destination: &column.destination,
                        value,
                    });
                }
                MappingNode::User(user) => {
                    let value = coerce(
                        resolve_user_data(key, user_data),
                        user.force_type,
                        &user.destination,
                    )?;
                    if user.primary_key {
                        declared_key.push(user.destination.clone());
                    }
                    slots.push(Slot::Column {
                        destination: &user.destination,
                        value,
                    });
                }
                MappingNode::Table(table) => slots.push(Slot::Table { key, node: table }),
            }
        }

        if let Some(link) = link.filter(|link| link.primary_key) {
            declared_key.push(link.column.clone());
        }

        let mut key_row = Row::new();
        for slot in &slots {
            if let Slot::Column { destination, value } = slot {
                key_row.insert(destination.to_string(), value.clone());
            }
        }
        if let Some(link) = link {
            key_row.insert(link.column.clone(), link.value.clone());
        }
        let primary_key = PrimaryKey::derive(&key_row, &declared_key, item);

        let mut row = Row::new();
        for slot in slots {
            match slot {
                Slot::Column { destination, value } => {
                    row.insert(destination.to_string(), value);
                }
                Slot::Table { key, node } => {
                    let children = self.children_of(key, node)?;
                    self.registry.get_or_create(&node.destination);

                    let data = locate(item, &node.path);
                    if is_empty(data) {
                        if !node.parent_key.disable {
                            row.insert(node.destination.clone(), String::new());
                        }
                        continue;
                    }

                    let child_link = ParentLink::new(&primary_key, destination, &node.parent_key);
                    let elements: Vec<&Value> = match data {
                        Some(Value::Array(items)) => items.iter().collect(),
                        Some(single) => vec![single],
                        None => Vec::new(),
                    };

                    for element in elements {
                        self.map_row(
                            &children,
                            &node.destination,
                            element,
                            child_link.as_ref(),
                            user_data,
                        )?;
                    }
                }
            }
        }

        if let Some(link) = link {
            row.insert(link.column.clone(), link.value.clone());
        }

        self.registry.append_row(destination, row, &declared_key);
        Ok(())
    }

    /// Child mapping for a table node: its own, or the one already producing its destination
    fn children_of(&mut self, key: &str, node: &TableNode) -> Result<Rc<NodeSet>, ConfigError> {
        if let Some(children) = &node.children {
            self.owners
                .entry(node.destination.clone())
                .or_insert_with(|| Rc::clone(children));
            return Ok(Rc::clone(children));
        }

        self.owners
            .get(&node.destination)
            .cloned()
            .ok_or_else(|| ConfigError::MissingKey {
                key: key.to_string(),
                kind: NodeKind::Table,
                missing: "tableMapping",
            })
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Tables in the order they were first reached
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.registry.iter()
    }

    pub fn table(&self, destination: &str) -> Option<&Table> {
        self.registry.get(destination)
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> TableRegistry {
        self.registry
    }

    /// Render one table using this mapper's header and line terminator options
    pub fn csv(&self, destination: &str) -> Option<String> {
        self.registry
            .get(destination)
            .map(|table| table.to_csv(self.config.write_header, self.config.line_terminator))
    }
}
