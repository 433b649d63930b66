use arborist::{NodeType, Tree, TreeError, parse_newick};

struct TreeTopology {
    tip_count: usize,
    internal_count: usize,
    total_count: usize,
    is_binary: bool,
}

#[test]
fn test_tree_topology_and_structure_validation() {
    let test_cases = vec![
        (
            "Simple bifurcating",
            "(A,B);",
            TreeTopology { tip_count: 2, internal_count: 1, total_count: 3, is_binary: true },
        ),
        (
            "Three-tip tree",
            "(A,B,C);",
            TreeTopology { tip_count: 3, internal_count: 1, total_count: 4, is_binary: false },
        ),
        (
            "Nested binary",
            "((A,B),(C,D));",
            TreeTopology { tip_count: 4, internal_count: 3, total_count: 7, is_binary: true },
        ),
        (
            "Mixed binary/multifurcating",
            "((A,B,C),(D,E));",
            TreeTopology { tip_count: 5, internal_count: 3, total_count: 8, is_binary: false },
        ),
        (
            "Unary chain",
            "((A));",
            TreeTopology { tip_count: 1, internal_count: 2, total_count: 3, is_binary: false },
        ),
    ];

    for (name, newick_str, expected) in test_cases {
        println!("Testing topology: {}", name);
        let tree = parse_newick(newick_str)
            .unwrap_or_else(|err| panic!("Failed to parse tree {}: {}", name, err));

        assert_eq!(tree.tip_count(), expected.tip_count, "tip count for {}", name);
        assert_eq!(
            tree.internal_node_count(),
            expected.internal_count,
            "internal count for {}",
            name
        );
        assert_eq!(tree.node_count(), expected.total_count, "node count for {}", name);
        assert_eq!(tree.is_binary(), expected.is_binary, "binary check for {}", name);
    }
}

#[test]
fn test_tree_height_and_tip_depths() {
    let test_cases = vec![
        ("Equal branch lengths", "(A:1.0,B:1.0);", 1.0, vec![1.0, 1.0]),
        ("Different tip distances", "(A:0.5,B:1.5);", 1.5, vec![0.5, 1.5]),
        ("Nested with heights", "((A:0.1,B:0.2):0.8,C:1.0);", 1.0, vec![0.9, 1.0, 1.0]),
        (
            "Ultrametric tree",
            "((A:0.5,B:0.5):0.5,(C:0.5,D:0.5):0.5);",
            1.0,
            vec![1.0, 1.0, 1.0, 1.0],
        ),
    ];

    for (name, newick_str, expected_height, expected_depths) in test_cases {
        println!("Testing tree heights: {}", name);
        let tree = parse_newick(newick_str).unwrap();

        let height = tree.height();
        assert!(
            (height - expected_height).abs() < 1e-9,
            "Tree height mismatch for {}: expected {}, got {}",
            name,
            expected_height,
            height
        );

        let depths: Vec<f64> = tree
            .tip_heights()
            .iter()
            .map(|(_, depth)| depth.value)
            .collect();
        assert_eq!(depths.len(), expected_depths.len(), "tip count for {}", name);
        for (actual, expected) in depths.iter().zip(&expected_depths) {
            assert!((actual - expected).abs() < 1e-9, "tip depth for {}", name);
        }
    }
}

#[test]
fn test_node_types() {
    let tree = parse_newick("((A,B)X,C)R;").unwrap();
    let expected = [
        ("R", NodeType::Root),
        ("X", NodeType::Internal),
        ("A", NodeType::Tip),
        ("C", NodeType::Tip),
    ];
    for (label, node_type) in expected {
        let id = tree.node_id_by_label(label).unwrap();
        assert_eq!(tree.node(id).unwrap().node_type(), node_type, "{}", label);
    }
}

#[test]
fn test_build_tree_by_hand() {
    let mut tree = Tree::new();
    let root = tree.add_new_node(<Option<&str>>::None, None, None, None).unwrap();
    let inner = tree.add_new_node(<Option<&str>>::None, Some(1e0), Some(95e0), Some(root)).unwrap();
    _ = tree.add_new_node(Some("A"), Some(2e0), None, Some(inner)).unwrap();
    _ = tree.add_new_node(Some("B"), Some(3e0), None, Some(inner)).unwrap();
    _ = tree.add_new_node(Some("C"), Some(4e0), None, Some(root)).unwrap();

    assert_eq!(arborist::write_newick(&tree), "((A:2,B:3)95:1,C:4);");
    assert_eq!(tree.total_length(), 10.0);

    assert_eq!(tree.label_internal_nodes("N"), 2);
    assert_eq!(arborist::write_newick(&tree), "((A:2,B:3)N2:1,C:4)N1;");
    assert_eq!(tree.support(inner), Some(95.0));

    let orphan = tree.add_new_node(Some("D"), None, None, None);
    assert_eq!(orphan, Err(TreeError::RootAlreadySet));
}

#[test]
fn test_traversal_orders() {
    let tree = parse_newick("((A,B)X,(C,D)Y)R;").unwrap();
    let root = tree.root_id().unwrap();
    let labels = |ids: Vec<arborist::NodeId>| -> Vec<String> {
        ids.into_iter().map(|id| tree.describe(id)).collect()
    };

    assert_eq!(labels(tree.preorder(root)), ["R", "X", "A", "B", "Y", "C", "D"]);
    assert_eq!(labels(tree.levelorder(root)), ["R", "X", "Y", "A", "B", "C", "D"]);
    let postorder = labels(tree.postorder(root));
    assert_eq!(postorder.last().map(String::as_str), Some("R"));
    let a = tree.node_id_by_label("A").unwrap();
    assert_eq!(labels(tree.path_to_root(a)), ["A", "X", "R"]);
}
