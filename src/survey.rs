use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use survey_tabs::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
mod io_common;
mod io_workbook;

use crate::survey::config_reader::*;
use crate::survey::io_common::simplify_file_name;
use crate::survey::io_workbook::*;

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error opening workbook {path}"))]
    OpeningWorkbook {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet {name:?} (available: {available})"))]
    MissingSheet { name: String, available: String },
    #[snafu(display(
        "Several worksheets may hold the responses ({candidates}), choose one with --sheet or responseSheet"
    ))]
    AmbiguousSheet { candidates: String },
    #[snafu(display("Error reading {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Invalid value for {field}: {value:?}"))]
    InvalidValue { field: String, value: String },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The summary differs from the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// The responses and the answer key of a workbook, ready for tabulation.
#[derive(Debug, Clone)]
pub struct LoadedSurvey {
    pub convention: Convention,
    pub schema: Schema,
    pub table: ResponseTable,
}

pub fn load_survey(workbook: &Workbook, source: &WorkbookSource) -> SurveyResult<LoadedSurvey> {
    let key_name = source.answer_key_sheet();
    let meta_name = source.variable_info_sheet();
    let convention = match source.convention()? {
        Some(c) => c,
        None => detect_convention(workbook, &meta_name),
    };
    info!("load_survey: convention: {}", convention.as_str());

    let responses = response_sheet(
        workbook,
        source.response_sheet.as_deref(),
        &[key_name.as_str(), meta_name.as_str()],
    )?;
    let header_row = source.header_row_index()?;
    let table = ResponseTable::from_sheet(responses, header_row, source.skipped_rows(convention));
    if table.question_bases().is_empty() {
        whatever!(
            "Worksheet {:?}: no question column in row {}",
            responses.name,
            header_row + 1
        );
    }
    let schema = parse_schema_with_metadata(
        workbook.sheet(&key_name),
        workbook.sheet(&meta_name),
        convention,
    );
    info!(
        "load_survey: {} respondents, {} columns, {} questions in the answer key",
        table.num_rows(),
        table.columns().len(),
        schema.questions().len()
    );
    Ok(LoadedSurvey {
        convention,
        schema,
        table,
    })
}

/// Without explicit questions, every classified question is tabulated with its first
/// recommended type.
fn default_requests(survey: &LoadedSurvey) -> Vec<QuestionRequest> {
    classify_questions(&survey.table, &survey.schema, survey.convention)
        .iter()
        .filter_map(|(id, tags)| {
            tags.iter()
                .next()
                .map(|tag| QuestionRequest::new(id, Aggregator::from(*tag)))
        })
        .collect()
}

pub fn tabulate_request(request: &SurveyRequest, survey: &LoadedSurvey) -> SurveyResult<JSValue> {
    let mut requests = request.question_requests()?;
    if requests.is_empty() {
        requests = default_requests(survey);
        info!(
            "tabulate_request: no questions requested, using {} classified questions",
            requests.len()
        );
    }
    let outcomes = run_batch(
        &survey.table,
        &survey.schema,
        survey.convention,
        &request.filter_spec(),
        &requests,
    );
    Ok(build_summary_js(request, survey, &outcomes))
}

fn details_to_json(details: &ResultDetails) -> JSValue {
    match details {
        ResultDetails::Empty => json!({}),
        ResultDetails::SingleChoice { total } => json!({ "total": total }),
        ResultDetails::MultiSelect {
            total_respondents,
            total_responses,
        } => json!({
            "totalRespondents": total_respondents,
            "totalResponses": total_responses
        }),
        ResultDetails::Matrix { col_totals } => json!({ "colTotals": col_totals }),
        ResultDetails::Ranked {
            max_rank,
            observed_max_rank,
            total_respondents,
            col_totals,
        } => json!({
            "maxRank": max_rank,
            "observedMaxRank": observed_max_rank,
            "totalRespondents": total_respondents,
            "colTotals": col_totals
        }),
        ResultDetails::Nps { breakdowns } => {
            let l: Vec<JSValue> = breakdowns
                .iter()
                .map(|b| {
                    json!({
                        "label": b.label,
                        "promoters": b.promoters,
                        "neutrals": b.neutrals,
                        "detractors": b.detractors,
                        "total": b.total,
                        "npsScore": b.nps_score,
                        "averageScore": b.average_score
                    })
                })
                .collect();
            json!({ "breakdowns": l })
        }
        ResultDetails::CrossCut {
            cut_question,
            total_respondents,
            cut_totals,
        } => json!({
            "cutQuestion": cut_question,
            "totalRespondents": total_respondents,
            "cutTotals": cut_totals
        }),
        ResultDetails::Allocation { col_totals } => json!({ "colTotals": col_totals }),
    }
}

fn outcome_to_json(outcome: &QuestionOutcome) -> JSValue {
    let r = &outcome.result;
    let mut js = json!({
        "questionCode": r.question_id,
        "type": r.aggregator.as_str(),
        "questionText": r.question_text,
        "rowLabels": r.row_labels,
        "colLabels": r.col_labels,
        "countMatrix": r.count_matrix,
        "percentMatrix": r.percent_matrix,
        "rowTotals": r.row_totals,
        "rowOverallPct": r.row_overall_pct,
        "details": details_to_json(&r.details),
    });
    if let Some(e) = outcome.error() {
        js["error"] = json!(e.to_string());
    }
    js
}

fn build_summary_js(
    request: &SurveyRequest,
    survey: &LoadedSurvey,
    outcomes: &[QuestionOutcome],
) -> JSValue {
    let filters: Vec<JSValue> = request
        .filter_spec()
        .clauses
        .iter()
        .filter(|c| !c.is_passthrough())
        .map(|c| json!({ "question": c.question, "value": c.label }))
        .collect();
    let mut config = json!({
        "reportName": request.output_settings.report_name,
        "convention": survey.convention.as_str(),
        "respondents": survey.table.num_rows(),
    });
    if let Some(e) = survey.schema.issue() {
        config["warning"] = json!(e.to_string());
    }
    json!({
        "config": config,
        "filters": filters,
        "results": outcomes.iter().map(outcome_to_json).collect::<Vec<JSValue>>()
    })
}

/// The recommended types of every coded question, in answer-key order.
pub fn classification_to_json(survey: &LoadedSurvey) -> JSValue {
    let c = classify_questions(&survey.table, &survey.schema, survey.convention);
    let l: Vec<JSValue> = c
        .iter()
        .map(|(id, tags)| {
            json!({
                "questionCode": id,
                "questionText": survey.schema.display_text(id),
                "types": tags.iter().map(|t| t.as_str()).collect::<Vec<&str>>()
            })
        })
        .collect();
    json!({ "questions": l })
}

/// Compares a summary with the reference, printing the differences.
pub fn check_reference(summary: &JSValue, reference: &JSValue, path: &str) -> SurveyResult<()> {
    let pretty_js_stats = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    let pretty_js_ref = serde_json::to_string_pretty(reference).context(ParsingJsonSnafu {})?;
    if pretty_js_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_ref.as_str(), pretty_js_stats.as_ref(), "\n");
        return ReferenceMismatchSnafu { path }.fail();
    }
    Ok(())
}

fn write_output(out: Option<&str>, contents: &str) -> SurveyResult<()> {
    match out {
        None | Some("") | Some("stdout") => {
            println!("{}", contents);
        }
        Some(path) => {
            fs::write(path, contents).context(WritingOutputSnafu { path })?;
            info!("write_output: summary written to {:?}", path);
        }
    }
    Ok(())
}

// Paths in a request are relative to the directory of the request.
fn resolve_path(root: Option<&Path>, path: &str) -> String {
    match root {
        Some(r) => {
            let p: PathBuf = [r, Path::new(path)].iter().collect();
            p.as_path().display().to_string()
        }
        None => path.to_string(),
    }
}

fn default_request(input: &str) -> SurveyRequest {
    SurveyRequest {
        output_settings: OutputSettings {
            report_name: simplify_file_name(input),
            output_path: None,
        },
        workbook_source: WorkbookSource::new(input),
        filters: Vec::new(),
        questions: Vec::new(),
    }
}

pub fn run(args: &Args) -> SurveyResult<()> {
    let (mut request, root): (SurveyRequest, Option<PathBuf>) = match (&args.config, &args.input) {
        (Some(config_path), _) => {
            let req = read_request(config_path)?;
            let root = Path::new(config_path).parent().map(|p| p.to_path_buf());
            (req, root)
        }
        (None, Some(input)) => (default_request(input), None),
        (None, None) => whatever!("Either --config or --input must be provided"),
    };
    debug!("run: request: {:?}", request);

    // Command line options override the request.
    let workbook_path = match &args.input {
        Some(input) => input.clone(),
        None => resolve_path(root.as_deref(), &request.workbook_source.file_path),
    };
    if let Some(sheet) = &args.sheet {
        request.workbook_source.response_sheet = Some(sheet.clone());
    }
    if let Some(convention) = &args.convention {
        request.workbook_source.convention = Some(convention.clone());
    }
    let out: Option<String> = match &args.out {
        Some(o) => Some(o.clone()),
        None => request
            .output_settings
            .output_path
            .as_ref()
            .map(|p| resolve_path(root.as_deref(), p)),
    };

    let workbook = read_workbook(&workbook_path)?;
    let survey = load_survey(&workbook, &request.workbook_source)?;

    let result_js = if args.classify {
        classification_to_json(&survey)
    } else {
        tabulate_request(&request, &survey)?
    };
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_output(out.as_deref(), &pretty_js_stats)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        check_reference(&result_js, &summary_ref, summary_p)?;
        info!("run: summary matches the reference {:?}", summary_p);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[Value]) -> Vec<Value> {
        cells.to_vec()
    }

    fn legacy_workbook() -> Workbook {
        let n = |x: i64| Value::from(x);
        let t = Value::text;
        let responses = Sheet::from_rows(
            "Responses",
            vec![
                row(&[t("Survey export")]),
                row(&[]),
                row(&[t("ID"), t("Q1"), t("Q2: Tea"), t("Q2: Coffee")]),
                row(&[n(1), n(1), n(1), n(0)]),
                row(&[n(2), n(2), n(0), n(1)]),
                row(&[n(3), n(1), n(1), n(1)]),
                row(&[n(4), n(2), Value::Empty, Value::Empty]),
            ],
        );
        let key = Sheet::from_rows(
            "Answer key",
            vec![
                row(&[t("Q1"), t("Do you like us?")]),
                row(&[n(1), t("Yes")]),
                row(&[n(2), t("No")]),
                row(&[]),
                row(&[t("Q2"), t("Drinks")]),
                row(&[n(1), t("Tea")]),
                row(&[n(2), t("Coffee")]),
            ],
        );
        Workbook::new(vec![responses, key])
    }

    fn request(filters: &str, questions: &str) -> SurveyRequest {
        parse_request(&format!(
            r#"{{"outputSettings": {{"reportName": "Wave 1"}},
                "workbookSource": {{"filePath": "wave1.xlsx"}},
                "filters": {},
                "questions": {}}}"#,
            filters, questions
        ))
        .unwrap()
    }

    #[test]
    fn summary_json() {
        let _ = env_logger::builder().is_test(true).try_init();
        let req = request(
            "[]",
            r#"[{"id": "Q2", "type": "multi_select"},
                {"id": "Q1", "type": "single_choice", "sortOrder": "desc"},
                {"id": "Q9", "type": "single_choice"}]"#,
        );
        let survey = load_survey(&legacy_workbook(), &req.workbook_source).unwrap();
        assert_eq!(survey.convention, Convention::Legacy);
        assert_eq!(survey.table.num_rows(), 4);

        let js = tabulate_request(&req, &survey).unwrap();
        assert_eq!(js["config"]["reportName"], json!("Wave 1"));
        assert_eq!(js["config"]["respondents"], json!(4));
        let results = js["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["questionCode"], json!("Q1"));
        assert_eq!(results[0]["questionText"], json!("Q1: Do you like us?"));
        assert_eq!(results[0]["countMatrix"], json!([[2], [2]]));
        assert_eq!(results[0]["percentMatrix"], json!([[50.0], [50.0]]));
        assert_eq!(results[0]["details"], json!({ "total": 4 }));
        assert_eq!(results[0].get("error"), None);

        assert_eq!(results[1]["type"], json!("multi_select"));
        assert_eq!(results[1]["rowLabels"], json!(["Tea", "Coffee"]));
        assert_eq!(results[1]["percentMatrix"], json!([[66.67, 50.0], [66.67, 50.0]]));
        assert_eq!(
            results[1]["details"],
            json!({ "totalRespondents": 3, "totalResponses": 4 })
        );

        assert_eq!(results[2]["questionCode"], json!("Q9"));
        assert!(results[2]["error"].as_str().unwrap().contains("Q9"));
    }

    #[test]
    fn filtered_summary() {
        let req = request(
            r#"[{"question": "Q1", "value": "Yes"}, {"question": "Q2", "value": "__all__"}]"#,
            r#"[{"id": "Q2", "type": "multi_select"}]"#,
        );
        let survey = load_survey(&legacy_workbook(), &req.workbook_source).unwrap();
        let js = tabulate_request(&req, &survey).unwrap();
        assert_eq!(js["filters"], json!([{ "question": "Q1", "value": "Yes" }]));
        assert_eq!(js["results"][0]["rowTotals"], json!([2, 1]));
    }

    #[test]
    fn classification_and_defaults() {
        let req = request("[]", "[]");
        let survey = load_survey(&legacy_workbook(), &req.workbook_source).unwrap();
        let js = classification_to_json(&survey);
        assert_eq!(
            js["questions"],
            json!([
                {"questionCode": "Q1", "questionText": "Q1: Do you like us?", "types": ["single_choice"]},
                {"questionCode": "Q2", "questionText": "Q2: Drinks", "types": ["multi_select"]}
            ])
        );
        let summary = tabulate_request(&req, &survey).unwrap();
        let types: Vec<&str> = summary["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["type"].as_str().unwrap())
            .collect();
        assert_eq!(types, vec!["single_choice", "multi_select"]);
    }

    #[test]
    fn reference_comparison() {
        let req = request("[]", r#"[{"id": "Q1", "type": "single_choice"}]"#);
        let survey = load_survey(&legacy_workbook(), &req.workbook_source).unwrap();
        let js = tabulate_request(&req, &survey).unwrap();
        let text = serde_json::to_string(&js).unwrap();
        let reference: JSValue = serde_json::from_str(&text).unwrap();
        assert!(check_reference(&js, &reference, "ref.json").is_ok());

        let mut other = reference.clone();
        other["results"][0]["countMatrix"] = json!([[1], [3]]);
        assert!(matches!(
            check_reference(&js, &other, "ref.json"),
            Err(SurveyError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn request_paths() {
        assert_eq!(resolve_path(None, "a.xlsx"), "a.xlsx");
        assert_eq!(
            resolve_path(Some(Path::new("/data/surveys")), "a.xlsx"),
            "/data/surveys/a.xlsx"
        );
        assert_eq!(
            resolve_path(Some(Path::new("/data/surveys")), "/tmp/a.xlsx"),
            "/tmp/a.xlsx"
        );
        let req = default_request("data/wave 2.xlsx");
        assert_eq!(req.output_settings.report_name, "wave 2");
    }
}
