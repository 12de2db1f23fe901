//! Bundled sample changelog.

/// A sample YAML changelog demonstrating the document format.
///
/// Written out by `strata generate` so a new project starts from a working
/// document instead of a blank page.
pub const SAMPLE_CHANGELOG: &str = r#"databaseChangeLog:
  - changeSet:
      id: 1
      author: john.doe
      comment: Create users table
      changes:
        - createTable:
            tableName: users
            columns:
              - name: id
                type: INTEGER
                constraints:
                  primaryKey: true
                  autoIncrement: true
              - name: username
                type: VARCHAR(50)
                constraints:
                  nullable: false
                  unique: true
              - name: email
                type: VARCHAR(100)
                constraints:
                  nullable: false
              - name: created_at
                type: TIMESTAMP
                defaultValue: CURRENT_TIMESTAMP
      rollback:
        - dropTable:
            tableName: users

  - changeSet:
      id: 2
      author: john.doe
      comment: Create posts table
      changes:
        - createTable:
            tableName: posts
            columns:
              - name: id
                type: INTEGER
                constraints:
                  primaryKey: true
                  autoIncrement: true
              - name: user_id
                type: INTEGER
                constraints:
                  nullable: false
              - name: title
                type: VARCHAR(200)
              - name: content
                type: TEXT
              - name: published
                type: BOOLEAN
                defaultValue: false
        - createIndex:
            indexName: idx_posts_user_id
            tableName: posts
            columns:
              - name: user_id
      rollback:
        - dropTable:
            tableName: posts

  - changeSet:
      id: 3
      author: jane.smith
      comment: Add phone column to users
      changes:
        - addColumn:
            tableName: users
            column:
              name: phone
              type: VARCHAR(20)
      rollback:
        - dropColumn:
            tableName: users
            columnName: phone
"#;

/// The sample changelog document.
pub fn sample_changelog_yaml() -> &'static str {
    SAMPLE_CHANGELOG
}
