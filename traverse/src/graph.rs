use std::cmp::Reverse;
use std::collections::BinaryHeap;

use flow::{CompiledFunc, Diagnostics, Flow, Serial, TypeId, TypeTable};

use crate::{HashMap, HashSet, Node, NodeKind, Schedule};

/// Build and validate the dependency graph of one flow, returning the
/// generator's schedule. Problems are reported into `diags`; `None` means
/// the flow is not generatable.
pub fn resolve(flow: &Flow, types: &TypeTable, diags: &mut Diagnostics) -> Option<Schedule> {
    let before = diags.len();

    // producer map: each output type has exactly one producing task.
    let mut producers: HashMap<TypeId, usize> = HashMap::default();
    for (i, task) in flow.tasks.iter().enumerate() {
        for &ty in &task.func.outputs {
            match producers.get(&ty) {
                Some(&prev) => diags.add(
                    task.pos.clone(),
                    format!(
                        "type {} is already produced by task \"{}\"",
                        types.canonical(ty),
                        flow.tasks[prev].func.name
                    ),
                ),
                None => {
                    producers.insert(ty, i);
                }
            }
        }
    }

    let mut params: HashSet<TypeId> = HashSet::default();
    for param in &flow.params {
        if let Some(&p) = producers.get(&param.ty) {
            diags.add(
                param.pos.clone(),
                format!(
                    "flow parameter type {} is also produced by task \"{}\"",
                    types.canonical(param.ty),
                    flow.tasks[p].func.name
                ),
            );
        }
        params.insert(param.ty);
    }

    // every declared result must come out of some task.
    for out in &flow.results {
        if !producers.contains_key(&out.ty) {
            diags.add(
                out.pos.clone(),
                format!(
                    "no task produces the declared flow result {}",
                    types.canonical(out.ty)
                ),
            );
        }
    }

    // one node per task, plus one per predicate.
    let mut nodes: Vec<Node> = Vec::with_capacity(flow.tasks.len() * 2);
    for (i, task) in flow.tasks.iter().enumerate() {
        let mut deps = resolve_inputs(&task.func, i, flow, types, &producers, &params, diags);
        if let (Some(pred), Some(pred_serial)) = (&task.predicate, task.predicate_serial) {
            let pred_deps = resolve_inputs(pred, i, flow, types, &producers, &params, diags);
            nodes.push(Node {
                kind: NodeKind::Predicate { task_index: i },
                serial: pred_serial,
                deps: pred_deps,
                gates: Vec::new(),
            });
            deps.push(pred_serial);
        }
        nodes.push(Node {
            kind: NodeKind::Task { index: i },
            serial: task.serial,
            deps,
            gates: Vec::new(),
        });
    }

    if diags.len() > before {
        return None;
    }

    // predicate skip-sets: a false predicate skips its task and every task
    // that transitively depends only on gated producers. Flow parameters and
    // produced-elsewhere inputs break the "only" condition.
    for (i, task) in flow.tasks.iter().enumerate() {
        let pred_serial = match task.predicate_serial {
            Some(s) => s,
            None => continue,
        };
        let mut gated = vec![false; flow.tasks.len()];
        gated[i] = true;
        let mut changed = true;
        while changed {
            changed = false;
            for (j, candidate) in flow.tasks.iter().enumerate() {
                if gated[j] || candidate.func.inputs.is_empty() {
                    continue;
                }
                let all_gated = candidate.func.inputs.iter().all(|ty| {
                    !params.contains(ty)
                        && producers.get(ty).is_some_and(|&p| gated[p])
                });
                if all_gated {
                    gated[j] = true;
                    changed = true;
                }
            }
        }
        for node in nodes.iter_mut() {
            if let NodeKind::Task { index } = node.kind {
                if gated[index] {
                    node.gates.push(pred_serial);
                }
            }
        }
    }

    topo_sort(nodes, flow, diags).map(|nodes| Schedule { nodes })
}

fn resolve_inputs(
    func: &CompiledFunc,
    task_index: usize,
    flow: &Flow,
    types: &TypeTable,
    producers: &HashMap<TypeId, usize>,
    params: &HashSet<TypeId>,
    diags: &mut Diagnostics,
) -> Vec<Serial> {
    let mut deps = Vec::with_capacity(func.inputs.len());
    for &ty in &func.inputs {
        if params.contains(&ty) {
            // satisfied by the flow entry; no job dependency.
            continue;
        }
        match producers.get(&ty) {
            Some(&p) if p == task_index && func.outputs.contains(&ty) => diags.add(
                func.pos.clone(),
                format!(
                    "task \"{}\" depends on its own output {}",
                    func.name,
                    types.canonical(ty)
                ),
            ),
            Some(&p) => deps.push(flow.tasks[p].serial),
            None => diags.add(
                func.pos.clone(),
                format!(
                    "no task produces {}, required by \"{}\"",
                    types.canonical(ty),
                    func.name
                ),
            ),
        }
    }
    deps.sort();
    deps.dedup();
    deps
}

/// Kahn's ordering with ascending serial as the tie-break, which keeps
/// generated output stable across runs. Anything left over is a cycle.
fn topo_sort(nodes: Vec<Node>, flow: &Flow, diags: &mut Diagnostics) -> Option<Vec<Node>> {
    let index_of: HashMap<Serial, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.serial, i))
        .collect();

    let mut indegree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        indegree[i] = node.deps.len();
        for dep in &node.deps {
            dependents[index_of[dep]].push(i);
        }
    }

    let mut heap: BinaryHeap<Reverse<(Serial, usize)>> = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| indegree[*i] == 0)
        .map(|(i, n)| Reverse((n.serial, i)))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse((_, i))) = heap.pop() {
        order.push(i);
        for &d in &dependents[i] {
            indegree[d] -= 1;
            if indegree[d] == 0 {
                heap.push(Reverse((nodes[d].serial, d)));
            }
        }
    }

    if order.len() < nodes.len() {
        let mut stuck: Vec<&str> = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| indegree[*i] > 0)
            .filter_map(|(_, n)| match n.kind {
                NodeKind::Task { index } => Some(flow.tasks[index].func.name.as_str()),
                NodeKind::Predicate { .. } => None,
            })
            .collect();
        stuck.sort_unstable();
        diags.add(
            flow.pos.clone(),
            format!("dependency cycle involving: {}", stuck.join(", ")),
        );
        return None;
    }

    // reorder into emit order.
    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    Some(
        order
            .into_iter()
            .map(|i| slots[i].take().expect("node emitted twice"))
            .collect(),
    )
}
