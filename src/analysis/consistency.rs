use crate::phylo::{Tree, TreeError, TreeFloat};
use rustc_hash::FxHashMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// Binary character states per OTU; each column is one site.
///
/// Lines read as `label<sep>s1<sep>s2...` where the separator is whitespace
/// or a comma and each state is `0`, `1`, or `?`/`-` for unknown. A single
/// state field of several characters (`A 0110`) is split into one site per
/// character. Blank lines and lines starting with `#` are skipped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TraitTable {
    rows: FxHashMap<String, Vec<Option<bool>>>,
    site_count: usize,
}

impl TraitTable {
    pub fn new() -> Self { Self::default() }

    pub fn site_count(&self) -> usize { self.site_count }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn states(&self, label: &str) -> Option<&[Option<bool>]> {
        self.rows.get(label).map(Vec::as_slice)
    }

    /// Adds or replaces the states of one OTU. Every OTU must have the same
    /// number of sites.
    pub fn insert(
        &mut self,
        label: impl Into<String>,
        states: Vec<Option<bool>>,
    ) -> Result<(), TreeError> {
        let label = label.into();
        if self.rows.is_empty() {
            self.site_count = states.len();
        } else if states.len() != self.site_count {
            return Err(TreeError::InvalidArgument(format!(
                "'{label}' has {} sites, expected {}",
                states.len(),
                self.site_count
            )));
        }
        _ = self.rows.insert(label, states);
        Ok(())
    }
}

fn parse_state(token: &str) -> Option<Option<bool>> {
    match token {
        "0" => Some(Some(false)),
        "1" => Some(Some(true)),
        "?" | "-" => Some(None),
        _ => None,
    }
}

impl FromStr for TraitTable {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut table = TraitTable::new();
        for (line_number, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|field| !field.is_empty());
            let Some(label) = fields.next() else {
                continue;
            };
            let fields: Vec<&str> = fields.collect();
            let tokens: Vec<String> = match fields[..] {
                [single] if single.len() > 1 => {
                    single.chars().map(String::from).collect()
                }
                _ => fields.iter().map(|f| f.to_string()).collect(),
            };

            let states = tokens
                .iter()
                .map(|token| {
                    parse_state(token).ok_or_else(|| {
                        TreeError::InvalidArgument(format!(
                            "line {}: '{token}' is not a binary state",
                            line_number + 1
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if states.is_empty() {
                return Err(TreeError::InvalidArgument(format!(
                    "line {}: '{label}' has no states",
                    line_number + 1
                )));
            }
            table.insert(label, states)?;
        }
        Ok(table)
    }
}

/// Consistency index of one informative site.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyRow {
    /// 1-based column of the site in the table.
    pub site: usize,
    pub states: usize,
    pub min_steps: usize,
    pub steps: usize,
    pub ci: TreeFloat,
}

const STATE_0: u8 = 0b01;
const STATE_1: u8 = 0b10;
const UNKNOWN: u8 = STATE_0 | STATE_1;

/// Parsimony consistency index for every informative site.
///
/// A site is informative when each state occurs in at least two OTUs of
/// the tree. Steps are counted with the Fitch-Hartigan pass, which handles
/// multifurcations; OTUs absent from the table or marked unknown cost no
/// steps. Uninformative sites are omitted.
///
/// The index is `min_steps / steps`, where `min_steps` is the number of
/// states minus one: a binary site needs at least one change, so
/// `min_steps` is always 1 and a site that fits the tree perfectly scores
/// 1.0. The two observed states are reported separately in `states`.
pub fn consistency_index(
    tree: &Tree,
    table: &TraitTable,
) -> Result<Vec<ConsistencyRow>, TreeError> {
    let tip_ids = tree.tip_node_ids_all();
    let tip_states: Vec<Option<&[Option<bool>]>> = tip_ids
        .iter()
        .map(|&id| tree.label(id).and_then(|label| table.states(&label)))
        .collect();

    let matched = tip_states.iter().filter(|states| states.is_some()).count();
    if matched == 0 {
        return Err(TreeError::MissingData(
            "no OTU of the tree appears in the trait table".to_string(),
        ));
    }
    if matched < tip_ids.len() {
        warn!(
            "{} OTUs are missing from the trait table",
            tip_ids.len() - matched
        );
    }

    let postorder = tree.postorder_all();
    let mut rows = Vec::new();
    for site in 0..table.site_count() {
        let leaf_sets: Vec<u8> = tip_states
            .iter()
            .map(|states| match states.and_then(|s| s[site]) {
                Some(false) => STATE_0,
                Some(true) => STATE_1,
                None => UNKNOWN,
            })
            .collect();

        let zeros = leaf_sets.iter().filter(|&&s| s == STATE_0).count();
        let ones = leaf_sets.iter().filter(|&&s| s == STATE_1).count();
        if zeros < 2 || ones < 2 {
            continue;
        }

        let mut sets: FxHashMap<_, u8> = tip_ids
            .iter()
            .copied()
            .zip(leaf_sets)
            .collect();
        let mut steps: usize = 0;
        for &node_id in &postorder {
            let child_ids = tree.child_ids(node_id);
            if child_ids.is_empty() {
                continue;
            }
            let counts = [STATE_0, STATE_1].map(|state| {
                child_ids
                    .iter()
                    .filter(|&&id| sets.get(&id).is_some_and(|s| s & state != 0))
                    .count()
            });
            let best = counts[0].max(counts[1]);
            let mut set = 0;
            if counts[0] == best {
                set |= STATE_0;
            }
            if counts[1] == best {
                set |= STATE_1;
            }
            steps += child_ids.len() - best;
            _ = sets.insert(node_id, set);
        }

        let states: usize = 2;
        let min_steps = states - 1;
        rows.push(ConsistencyRow {
            site: site + 1,
            states,
            min_steps,
            steps,
            ci: min_steps as TreeFloat / steps.max(1) as TreeFloat,
        });
    }

    debug!(
        "{} of {} sites are informative",
        rows.len(),
        table.site_count()
    );
    Ok(rows)
}
