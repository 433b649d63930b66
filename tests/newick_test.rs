use arborist::{
    ErrorKind, TreeFormat, TreeParseError, parse_newick, parse_nhx, parse_tree,
    write_newick, write_nhx,
};

#[test]
fn test_newick_round_trip() {
    let test_cases = vec![
        ("Labels only", "((A,B),(C,D));"),
        ("Lengths", "((A:0.1,B:0.2):0.05,C:0.3);"),
        ("Support and root length", "(A:1,(B:2,C:3)80:4):0;"),
        ("Internal labels", "((A:1,B:2)X:3,C:4)R;"),
        ("Quoted labels", "('Homo sapiens':1,'O''Brien':2);"),
        ("Polytomy", "(A,B,C,D,E);"),
        ("Scientific notation", "(A:1e-8,B:0.000123);"),
        ("Single node", "A;"),
    ];

    for (name, newick_str) in test_cases {
        println!("Testing: {}", name);
        let tree = parse_newick(newick_str)
            .unwrap_or_else(|err| panic!("Failed to parse {}: {}", name, err));
        let written = write_newick(&tree);
        let reparsed = parse_newick(&written).unwrap();
        assert_eq!(write_newick(&reparsed), written, "stable output for {}", name);
        assert_eq!(tree.tip_labels(), reparsed.tip_labels(), "labels for {}", name);
        assert_eq!(tree.total_length(), reparsed.total_length(), "length for {}", name);
    }
}

#[test]
fn test_exact_output() {
    let test_cases = vec![
        ("Whitespace is dropped", " ( A : 1 , B : 2 ) ; ", "(A:1,B:2);"),
        ("Comments are dropped", "([&R]A[x]:1,B:2)[&B=10];", "(A:1,B:2);"),
        ("Trailing zeros", "(A:1.500,B:2.0);", "(A:1.5,B:2);"),
        ("Second tree ignored", "(A,B);\n(C,D);\n", "(A,B);"),
        ("Empty leaves", "(,,A);", "(,,A);"),
        ("Label needing quotes", "('A B',C);", "('A B',C);"),
    ];

    for (name, input, expected) in test_cases {
        println!("Testing: {}", name);
        let tree = parse_newick(input).unwrap();
        assert_eq!(write_newick(&tree), expected, "output for {}", name);
    }
}

#[test]
fn test_nhx_round_trip_keeps_metadata() {
    let input = "((A:1[&&NHX:S=Human:E=1.1.1],B:2[&S=Mouse])[&B=90]:3,C:4[&note=\"x y\"]);";
    let tree = parse_nhx(input).unwrap();

    let a = tree.node_id_by_label("A").unwrap();
    let a_node = tree.node(a).unwrap();
    assert_eq!(a_node.metadata().get("S"), Some("Human"));
    assert_eq!(a_node.metadata().get("E"), Some("1.1.1"));

    let ab = tree.lca_by_labels(&["A", "B"]).unwrap();
    assert_eq!(tree.support(ab), Some(90.0));

    let written = write_nhx(&tree);
    assert_eq!(
        written,
        "((A:1[&S=Human,E=1.1.1],B:2[&S=Mouse])90:3,C:4[&note=\"x y\"]);"
    );
    let reparsed = parse_nhx(&written).unwrap();
    assert_eq!(write_nhx(&reparsed), written);

    // Plain NEWICK drops comments entirely.
    assert_eq!(write_newick(&tree), "((A:1,B:2)90:3,C:4);");
    assert!(!parse_newick(input).unwrap().has_support_values());
}

#[test]
fn test_nhx_length_override() {
    let tree = parse_tree("(A:1[&branch_length=5],B:2);", TreeFormat::Nhx).unwrap();
    assert_eq!(tree.total_length(), 7.0);
}

#[test]
fn test_parse_errors() {
    let test_cases = vec![
        ("Missing semicolon", "(A,B)", TreeParseError::MissingTerminator(5)),
        ("Unclosed clade", "((A,B),C;", TreeParseError::UnbalancedParenthesis(0)),
        ("Extra close", "(A,B)),C;", TreeParseError::UnbalancedParenthesis(5)),
        (
            "Text length",
            "(A:one,B);",
            TreeParseError::InvalidNumber { token: "one".to_string(), offset: 3 },
        ),
        (
            "Disallowed label",
            "(A B,C);",
            TreeParseError::UnexpectedCharacter { character: 'B', offset: 3 },
        ),
        ("Open quote", "('A,B);", TreeParseError::UnterminatedQuote(1)),
        ("Blank", "   ", TreeParseError::EmptyInput),
    ];

    for (name, input, expected) in test_cases {
        println!("Testing: {}", name);
        let err = parse_newick(input).unwrap_err();
        assert_eq!(err, expected, "error for {}", name);
        assert_eq!(err.kind(), ErrorKind::Format, "kind for {}", name);
    }
}

#[test]
fn test_error_offsets_are_reported() {
    let err = parse_newick("((A:1,B:2):x,C);").unwrap_err();
    assert_eq!(err.offset(), Some(11));
    assert!(err.to_string().contains("'x'"));
}
