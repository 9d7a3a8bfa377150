/*!

This is the long-form manual for `olympiad_ranking` and `olytab`.

## Input tables

The input of the `tabulate` mode is the export of a registration form, as an
Excel (.xlsx, .xls), OpenDocument (.ods) or CSV file. Every row is the attempt
of one student. The header does not need to be on the first row: the first
rows of the table are searched for a row that contains all the required
columns. The columns may come in any order, and extra columns are ignored.

The column labels are matched after removing the accents, lowercasing, and
dropping the trailing punctuation. The exact questions of the usual forms are
recognized first, then the labels of the generated reports, then fragments.

| Field                | Examples of accepted labels                                                 |
|----------------------|-----------------------------------------------------------------------------|
| name                 | `Nome do aluno?`, `Nome do estudante`, `Nome`                               |
| school (selected)    | `Selecione o nome da sua escola`, `Escola`                                  |
| school (free text)   | `Caso a escola não esteja na lista acima, escreva o nome aqui:`             |
| grade                | `Ano escolar do aluno:`, `Ano`, `Série`                                     |
| score                | `Total de pontuação ?`, `Pontuação`, `Nota`                                 |
| duration             | `Quanto tempo de realização?`, `Tempo`, `Duração`                           |
| disability/condition | `Se for aluno com deficiência/transtorno:`, `Deficiência/Transtorno`        |
| stage                | `ETAPA`, `Etapa de Classificação` (reports only, never required)            |

If a required column is missing, nothing is produced and the error lists the
missing fields along with the labels that were found.

### Values

- names are uppercased.
- schools: the abbreviation `EMEF` (with or without periods) is removed and
  the rest is uppercased. When the selected school is "not in the list", the
  free text answer is used instead.
- scores: numeric cells are truncated to an integer. In text cells, only
  the digits are kept. Anything else counts as zero.
- durations: `HH:MM:SS`, `MM:SS`, a plain number of seconds, or a cell
  formatted as a time in the spreadsheet. Anything else is unparsable, and
  ranks after all the parsable durations.
- grades: `3º ano` and its variants rank as 3, `EJAI 2ª etapa` ranks after
  all the standard grades. Any other label ranks last.

## Ranking

The entries are sorted by grade, then by score (highest first), then by
duration (shortest first). Entries that are equal on all three keep the order
of the input table.

The entries whose disability answer says that the student has none (for
example `Não possui deficiência/transtorno`, in any case) go to the general
track (olympic). All the others, including blank answers, go to the adapted
track (paralympic).

## Modes of `olytab`

### `tabulate`

Reads a form export, and writes three workbooks:
- `classificatoria_olimpiada.xlsx` the general track
- `classificatoria_paralimpiada.xlsx` the adapted track
- `classificatoria_juncao.xlsx` all the entries

Each workbook has a `GERAL` sheet with all its entries, then one sheet per
school in the order in which the schools first appear in the ranking. The
school sheets have a title row with the name of the school. Every row carries
the stage label given with `--stage`.

### `leaderboard`

Reads a generated workbook, and keeps the best entries of each grade on every
sheet (3 by default, see `--top-n`). Writes
`melhores_alunos_classificados.xlsx`.

### `merge_stages`

Reads the workbooks of two qualifier stages (`--input` and `--second-input`).
The sheets with the same name are merged and ranked again; each entry keeps the
label of its stage. Sheets only present in the first workbook are skipped and
listed in the summary. Writes `classificacao_organizada_todas_escolas.xlsx`.

### `combine`

Reads a generated workbook, and concatenates the rows of all its school
sheets, below their header, into one table. The `GERAL` sheet is left out, as
it repeats the rows of the school sheets. It also counts the students of
each school and grade. Writes `dados_combinados.xlsx`, `dados_combinados.csv`,
`tabela_dinamica.xlsx` and `tabela_dinamica.csv`.

## Banner

With `--banner`, a PNG or JPEG image is placed at the top of every sheet over
the first rows (4 by default, see `--banner-rows`), with a total height of 120
pixels by default (see `--banner-height`). The image is scaled down to fit and
centered; it is never enlarged. The fit takes the resolution of the image into
account, as spreadsheet programs draw a 72 dpi image larger than a 96 dpi one.

## Job files

All the options can be given in a JSON file with `--config`. The command line
flags take precedence. Relative paths are resolved against the directory of
the job file.

```json
{
  "mode": "merge_stages",
  "input": {"filePath": "etapa1.xlsx"},
  "secondInput": {"filePath": "etapa2.xlsx"},
  "stage": "1° CLASSIFICATÓRIA",
  "secondStage": "2° CLASSIFICATÓRIA",
  "banner": {"filePath": "logo.png", "heightPx": 120, "rows": 4},
  "topN": 3,
  "outputSettings": {"outputDirectory": "saida", "summaryPath": "resumo.json"}
}
```

## Summary

A summary of the run is produced in JSON format (`--summary`, or
`summaryPath` in the job file; `stdout` prints it). With `--reference`, the
summary is compared to a previous one, and the differences are printed.

*/
