/*!

This is the long-form manual for `portarias` and its command-line front end.

## Families

Four families of ordinances are supported:
* `gq` qualification bonus ("gratificação de qualificação")
* `remocao` transfer of a civil servant between units
* `vacancia` vacancy of a position
* `gsiste` inclusion in or exclusion from GSISTE

On the command line, `remocao` is also accepted as `removal` or
`movimentacao`, and `vacancia` as `vacancy`.

Every family but `gq` has several templates. The template is chosen by the
value of a discriminator field (`TIPO_REMOCAO`, `TIPO_VACANCIA`,
`TIPO_GSISTE`), compared after trimming and lower-casing. In a batch, the
discriminator can be given once for the whole spreadsheet as a form field, or
per row as a column.

| family     | sub-types                                                            |
|------------|----------------------------------------------------------------------|
| `gq`       |                                                                      |
| `remocao`  | `oficio_com_ajuda`, `oficio_sem_ajuda`, `a_pedido`, `a_pedido_conjuge` |
| `vacancia` | `a_pedido`, `inacumulavel`                                           |
| `gsiste`   | `concessao_622`, `concessao_654`, `exclusao_622`, `exclusao_654`     |

## Spreadsheet columns

Column headers are compared after trimming and upper-casing. A field is
provided if one of its accepted names is present. All the missing fields are
reported at once, before any document is generated.

### `gq`

| field              | accepted columns               | token       |
|--------------------|--------------------------------|-------------|
| `PROCESSO`         | `PROCESSO`                     | `#PROCESSO` |
| `TIPO DE GQ`       | `TIPO DE GQ`, `GQ`             | `#GQ`       |
| `NOME DO SERVIDOR` | `NOME DO SERVIDOR`, `SERVIDOR` | `#SERVIDOR` |
| `CPF`              | `CPF`                          | `#CPF`      |
| `SIAPE`            | `SIAPE`                        | `#SIAPE`    |
| `DATA DA GQ`       | `DATA DA GQ`, `DATAGQ`         | `#DATAGQ`   |

`GQI`, `GQII` and `GQIII` are written `GQ1`, `GQ2` and `GQ3`. Any other grade
gives an empty `#GQ`.

### `remocao`

| field            | accepted columns               | token             |
|------------------|--------------------------------|-------------------|
| `PROCESSO`       | `PROCESSO`                     | `#PROCESSO`       |
| `SERVIDOR`       | `SERVIDOR`, `NOME DO SERVIDOR` | `#SERVIDOR`       |
| `CPF`            | `CPF`                          | `#CPF`            |
| `SIAPE`          | `SIAPE`                        | `#SIAPE`          |
| `CARGO`          | `CARGO`                        | `#CARGO`          |
| `LOTACAOORIGEM`  | `LOTACAOORIGEM`                | `#LOTACAOORIGEM`  |
| `LOTACAODESTINO` | `LOTACAODESTINO`               | `#LOTACAODESTINO` |

The optional column `DATA_VIGENCIA` fills `#CLAUSULA_VIGENCIA` with
`, a partir de DD/MM/YYYY.`. Without it the token becomes `.`.

### `vacancia`

| field      | accepted columns   | token       |
|------------|--------------------|-------------|
| `PROCESSO` | `PROCESSO`         | `#PROCESSO` |
| `CARGO`    | `CARGO`            | `#CARGO`    |
| `CLASSE`   | `CLASSE`           | `#CLASSE`   |
| `PADRAO`   | `PADRAO`           | `#PADRAO`   |
| `NOME`     | `NOME`, `SERVIDOR` | `#NOME`     |
| `CPF`      | `CPF`              | `#CPF`      |
| `SIAPE`    | `SIAPE`            | `#SIAPE`    |
| `VACANCIA` | `VACANCIA`         | `#VACANCIA` |

The `inacumulavel` sub-type also requires `NOVOCARG` and `NOVOORG`
(tokens `#NOVOCARG` and `#NOVOORG`).

### `gsiste`

| field      | accepted columns | token       |
|------------|------------------|-------------|
| `PROCESSO` | `PROCESSO`       | `#PROCESSO` |
| `SERVIDOR` | `SERVIDOR`       | `#SERVIDOR` |
| `SIAPE`    | `SIAPE`          | `#SIAPE`    |
| `CARGO`    | `CARGO`          | `#CARGO`    |
| `LOTACAO`  | `LOTACAO`        | `#LOTACAO`  |

The exclusion sub-types also require `EXCLUSAO` (token `#EXCLUSAO`).

## Values

Empty cells are treated as absent, and the next accepted column is tried.
Absent values are replaced by an empty string. Numbers without a decimal part
are written without one (`1234567`, not `1234567.0`).

Dates are written `DD/MM/YYYY`. They can be date cells or text in one of
these forms: `2024-03-05`, `2024-03-05 00:00:00`, `2024/03/05`, `05/03/2024`,
`05-03-2024`, `05.03.2024`. Anything else is copied as it is.

When the name of the civil servant is absent, `ServidorDesconhecido` is used.

## Output

Documents are named `<label>_<name>_<YYYYMMDDHHMMSS>.docx`, where the label is
`Portaria_GQ`, `Portaria_Remocao`, `Portaria_Vacancia` or `Portaria_GSISTE`
and the spaces of the name are replaced by underscores. In an archive, a
repeated name receives a `_2`, `_3`, ... suffix.

A row that cannot be generated (unknown sub-type, missing template) is logged
and skipped. The batch fails only if no row could be generated.

## Configuration

The template file names can be changed with a JSON file:

```json
{
  "templateDirectory": "modelos",
  "gq": "Portariagq.docx",
  "removal": { "a_pedido": "remocao_a_pedido.docx" },
  "vacancy": { "inacumulavel": "vacancia_inacumulavel.docx" },
  "gsiste": { "exclusao_622": "gsiste_exclusao_622.docx" }
}
```

All the keys are optional. The entries of each table are added to the default
ones, or replace them.

 */
