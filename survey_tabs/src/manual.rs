/*!

This is the long-form manual for `survey_tabs` and `survtab`.

## Workbook conventions

Two layouts of survey exports are supported. Both have a sheet of responses (one row
per respondent, the header on the third row by default) and an answer key sheet named
`Answer key`.

### `legacy`

The answer key is made of blocks separated by blank rows. The first row of a block holds
the question identifier (`Q1`) and its text, the following rows hold a code and a label:

| A  | B               |
|----|-----------------|
| Q1 | Do you like us? |
| 1  | Yes             |
| 2  | No              |
|    |                 |
| Q2 | Drinks          |
| 1  | Tea             |

Grouped questions are answered in columns named after the options: `Q2: Tea`,
`Q2: Coffee`, or `Q3 | Brand A`. Net-promoter scores are stored shifted by one (the
score 0 is the code 1).

### `modern`

The identifier in the first column of the answer key is forward-filled: codes are in the
second column and labels in the third. Identifiers may name a sub-column (`Q7_2`), in which
case the row describes that sub-column. Grouped questions use numeric sub-indices
(`Q7_1`, `Q7_2`), and the first data row of the responses repeats the question texts
(it is skipped). The workbook ships a `Variable information` sheet with the full text of
every response column, from which the question texts are derived.

When the convention is not given, a workbook with a variable information sheet is
considered `modern`.

## Tabulations

* `single_choice` one bare column, one row per option. Percentages over the answers that
  match an option, rounded to 2 decimals.
* `multi_select` one indicator column per option. Two percentages per option: over the
  respondents and over the selections.
* `matrix` scale options by sub-questions, each column relative to its own answers.
* `ranked` items by rank position. The number of ranks is inferred from the data and
  optionally capped with `maxRank`.
* `nps` scores 0 to 10 by brand, with promoters (9-10), neutrals (7-8), detractors (0-6),
  the net-promoter score and the average score of every brand.
* `cross_cut` options of a question by options of the `cutQuestion`.
* `allocation` (also `share_of_wallet`) counts of allocations in the buckets `0–10`,
  `11–20`, ..., `91–100`.

Questions that cannot be tabulated produce a zero-filled result with an `error` entry. They
never stop the other questions.

## Request format

`survtab --config request.json` reads a JSON request:

```text
{
  "outputSettings": { "reportName": "Wave 3", "outputPath": "wave3_summary.json" },
  "workbookSource": {
    "filePath": "wave3.xlsx",
    "responseSheet": "Responses",
    "convention": "modern",
    "headerRowIndex": 3,
    "skipLabelRow": true,
    "answerKeySheet": "Answer key",
    "variableInfoSheet": "Variable information"
  },
  "filters": [ { "question": "Q2", "value": "North" } ],
  "questions": [
    { "id": "Q1", "type": "cross_cut", "cutQuestion": "Q2", "sortOrder": "desc" },
    { "id": "Q9", "type": "ranked", "maxRank": 3, "sortOrder": "asc", "sortColumn": "Rank 1" }
  ]
}
```

Only `outputSettings.reportName` and `workbookSource.filePath` are mandatory. Relative paths
are relative to the directory of the request.

Filters are applied to every question, in order. The value `__all__` disables a filter. A
filter whose value is not the label of an option of the question keeps no respondent at
all.

`sortOrder` is `none`, `asc` or `desc`. Rows are sorted by the percentage in
`sortColumn` when given, otherwise by the overall metric of the row (`Overall`).

Without `questions`, or with `survtab --input wave3.xlsx` and no request, every question
of the answer key is tabulated with the first type recommended by the classifier.
`survtab --input wave3.xlsx --classify` only prints these recommendations.

*/
