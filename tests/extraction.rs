use census_services::models::{Category, CategoryFilter, TaggedSheet, TotalRowHints};
use census_services::services::census::{Cell, ExtractionResult, Sheet, TrendPoint};
use census_services::services::dashboard::{build_snapshot, extract_all};
use census_services::{extract_banded, extract_flat};

fn grid(json: &str) -> Sheet {
    serde_json::from_str(json).unwrap()
}

fn values(result: &ExtractionResult) -> Vec<u64> {
    result.chart_data.iter().map(|p| p.value).collect()
}

#[test]
fn flat_sheet_with_configured_total_row() {
    let sheet = grid(
        r#"[
            ["รายงานผู้ป่วยนอกในเวลา"],
            ["Code", "Clinic", "2569-01-01", "2569-01-02"],
            ["C1", "Ward A", 10, 12],
            ["Total", "รวม", 120, 135]
        ]"#,
    );
    let result = extract_flat(&sheet, 4);

    assert_eq!(
        result.chart_data,
        vec![
            TrendPoint { date: "2569-01-01".into(), value: 120 },
            TrendPoint { date: "2569-01-02".into(), value: 135 },
        ]
    );
    assert_eq!(result.table_data.len(), 1);
    let ward = &result.table_data[0];
    assert_eq!((ward.code.as_str(), ward.name.as_str()), ("C1", "Ward A"));
    assert_eq!(ward.values, vec![Cell::Number(10.0), Cell::Number(12.0)]);
    assert_eq!(result.total_today, 135);
}

#[test]
fn flat_sheet_falls_back_when_hint_is_past_the_end() {
    let sheet = grid(
        r#"[
            ["Code", "Clinic", "2569-01-01", "2569-01-02"],
            ["Total", "Total", 50, 60],
            ["C1", "Ward A", 20, 25]
        ]"#,
    );
    let result = extract_flat(&sheet, 45);

    assert_eq!(values(&result), vec![50, 60]);
    assert_eq!(result.table_data.len(), 1);
    assert_eq!(result.table_data[0].name, "Ward A");
}

#[test]
fn banded_sheet_sums_each_triplet() {
    let sheet = grid(
        r#"[
            ["Ward", "Type", "Bed", "", "2569-01-01", "", ""],
            ["", "", "", "", "คงเหลือ", "รับใหม่", "รับย้าย"],
            ["W1", "อายุรกรรมชาย", 30, "", 2, 1, 0]
        ]"#,
    );
    let result = extract_banded(&sheet);

    assert_eq!(values(&result), vec![3]);
    assert_eq!(result.table_data[0].values, vec![Cell::Number(3.0)]);
    assert_eq!(result.total_today, 3);
}

#[test]
fn degenerate_sheets_give_empty_results() {
    let empty = ExtractionResult::default();
    assert_eq!(extract_flat(&[], 10), empty);
    assert_eq!(extract_banded(&[]), empty);

    let json = serde_json::to_value(&empty).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"chartData": [], "tableData": [], "dates": [], "totalToday": 0})
    );
}

fn row(cells: &[Cell]) -> Vec<Cell> {
    cells.to_vec()
}

fn extreme_grids() -> Vec<Sheet> {
    let t = |s: &str| Cell::from(s);
    vec![
        vec![
            row(&[t("Code"), t("Clinic"), t("2569-01-01"), t("2569-01-02")]),
            row(&[t("C1"), Cell::Number(1e300), Cell::Number(-5.0), t("99999999999999999999999")]),
            row(&[t("Total"), t("รวม"), Cell::Number(f64::NAN), Cell::Number(f64::INFINITY)]),
            row(&[Cell::Number(1e21), t("Ward"), Cell::Number(1e20), Cell::Number(f64::MAX)]),
        ],
        vec![
            row(&[t("Ward"), t("Type"), t("2569-01-01"), t(""), t(""), t("2569-01-02")]),
            row(&[]),
            row(&[t("W1"), t("ICU"), Cell::Number(1e20), Cell::Number(1e20), Cell::Number(f64::NEG_INFINITY)]),
            row(&[t("W2"), t("VIP"), t("-7"), Cell::Number(f64::NAN), t("1e400"), t("99999999999999999999999"), t("5")]),
            row(&[t("W3"), t("CCU"), Cell::Number(u64::MAX as f64), Cell::Number(u64::MAX as f64), Cell::Number(1.0)]),
        ],
    ]
}

fn check_invariants(result: &ExtractionResult) {
    assert_eq!(result.chart_data.len(), result.dates.len());
    assert_eq!(
        result.total_today,
        result.chart_data.last().map_or(0, |p| p.value)
    );
}

#[test]
fn malformed_grids_never_panic() {
    let mut sheets = vec![
        grid(r#"[[]]"#),
        grid(r#"[[], [], []]"#),
        grid(r#"[["2569-01-01"], [null], ["x", "y", "z"]]"#),
        grid(r#"[["a", "b", "2569-01-01", "2569-01-02"], ["1"], ["Total", "รวม", "abc"]]"#),
    ];
    sheets.extend(extreme_grids());

    for sheet in &sheets {
        for result in [extract_flat(sheet, 3), extract_banded(sheet)] {
            check_invariants(&result);
        }
    }
}

#[test]
fn extreme_numbers_clamp_instead_of_overflowing() {
    let grids = extreme_grids();

    let banded = extract_banded(&grids[1]);
    check_invariants(&banded);
    assert_eq!(values(&banded), vec![u64::MAX, u64::MAX]);

    let flat = extract_flat(&grids[0], 3);
    check_invariants(&flat);
    assert_eq!(values(&flat), vec![0, 0]);
    assert_eq!(flat.table_data[1].code, "1000000000000000000000");
}

#[test]
fn snapshot_survives_extreme_numbers() {
    let grids = extreme_grids();
    let sheets: Vec<TaggedSheet> = Category::ALL
        .iter()
        .map(|&category| TaggedSheet {
            category,
            rows: if category == Category::Ipd {
                grids[1].clone()
            } else {
                grids[0].clone()
            },
        })
        .collect();
    let hints = TotalRowHints {
        opd_time: 4,
        opd_special: 2,
        opd_premium: 99,
    };

    let reports = extract_all(&sheets, &hints).unwrap();
    for date in [None, Some("2569-01-01"), Some("2569-01-02")] {
        for filter in [CategoryFilter::All, CategoryFilter::Only(Category::Ipd)] {
            let snapshot = build_snapshot(&reports, date, filter).unwrap().unwrap();
            assert!(snapshot.total_patients >= snapshot.opd_special_combined);
        }
    }
    let latest = build_snapshot(&reports, None, CategoryFilter::All).unwrap().unwrap();
    assert_eq!(latest.total_patients, u64::MAX);
}

#[test]
fn extraction_is_repeatable() {
    let sheet = grid(
        r#"[
            ["Ward", "Type", "2569-01-01", "", "", "2569-01-02", "", ""],
            ["", "", "remain", "new", "in"],
            ["W1", "ICU", 10, "1", null, 11, 2, "n/a"],
            ["W2", "รวม", 99, 99, 99, 99, 99, 99]
        ]"#,
    );
    let first = extract_banded(&sheet);
    let second = extract_banded(&sheet);

    assert_eq!(first, second);
    assert_eq!(values(&first), vec![11, 13]);
}
