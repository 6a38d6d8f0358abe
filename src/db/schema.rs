//! SQL DDL for initializing the application database.
//! Ids are UUIDs stored as BLOB, dates as ISO-8601 TEXT, nested collections as JSON TEXT.

/// Statements are split on `;` at startup, so no literal may contain one.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id BLOB PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    nome TEXT NULL,
    empresa TEXT NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    plano TEXT NOT NULL DEFAULT 'free' CHECK (plano IN ('free', 'pro')),
    subscription_status TEXT NOT NULL DEFAULT 'inactive'
        CHECK (subscription_status IN ('inactive', 'active', 'past_due', 'canceled')),
    stripe_customer_id TEXT NULL UNIQUE,
    stripe_subscription_id TEXT NULL,
    current_period_end TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS api_tokens (
    token_hash TEXT PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS obras (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    nome TEXT NOT NULL,
    endereco TEXT NULL,
    cliente TEXT NULL,
    orcamento REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'planejamento'
        CHECK (status IN ('planejamento', 'em_andamento', 'pausada', 'concluida')),
    data_inicio TEXT NULL,
    data_previsao_fim TEXT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_obras_user ON obras(user_id);

CREATE TABLE IF NOT EXISTS categorias_despesa (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    nome TEXT NOT NULL,
    -- trimmed, Unicode-lowercased nome
    nome_key TEXT NOT NULL,
    cor TEXT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, nome_key)
);

CREATE TABLE IF NOT EXISTS lancamentos_financeiros (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    obra_id BLOB NOT NULL REFERENCES obras(id) ON DELETE CASCADE,
    descricao TEXT NOT NULL,
    valor REAL NOT NULL,
    data_gasto TEXT NOT NULL,
    categoria_id BLOB NULL REFERENCES categorias_despesa(id) ON DELETE SET NULL,
    fornecedor TEXT NULL,
    forma_pagamento TEXT NULL,
    observacoes TEXT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_lancamentos_obra ON lancamentos_financeiros(obra_id, data_gasto);
CREATE INDEX IF NOT EXISTS idx_lancamentos_categoria ON lancamentos_financeiros(categoria_id);

CREATE TABLE IF NOT EXISTS diarios_obra (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    obra_id BLOB NOT NULL REFERENCES obras(id) ON DELETE CASCADE,
    data TEXT NOT NULL,
    clima TEXT NULL,
    observacoes TEXT NULL,
    mao_de_obra TEXT NOT NULL DEFAULT '[]',
    equipamentos TEXT NOT NULL DEFAULT '[]',
    materiais TEXT NOT NULL DEFAULT '[]',
    atividades TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    UNIQUE (obra_id, data)
);

CREATE TABLE IF NOT EXISTS documentos (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    obra_id BLOB NULL REFERENCES obras(id) ON DELETE CASCADE,
    bucket TEXT NOT NULL
        CHECK (bucket IN ('documentos_obra', 'documentos_financeiros', 'company_assets')),
    folder TEXT NOT NULL,
    nome TEXT NOT NULL,
    path TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (bucket, path)
);

CREATE TABLE IF NOT EXISTS support_tickets (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    assunto TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'aberto'
        CHECK (status IN ('aberto', 'em_andamento', 'resolvido', 'fechado')),
    prioridade TEXT NOT NULL DEFAULT 'media' CHECK (prioridade IN ('baixa', 'media', 'alta')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS support_messages (
    id BLOB PRIMARY KEY,
    ticket_id BLOB NOT NULL REFERENCES support_tickets(id) ON DELETE CASCADE,
    sender_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    from_admin INTEGER NOT NULL DEFAULT 0,
    conteudo TEXT NOT NULL,
    lido INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_support_messages_ticket ON support_messages(ticket_id, created_at);

CREATE TABLE IF NOT EXISTS configuracoes_globais (
    chave TEXT PRIMARY KEY,
    valor TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recebimento_materiais (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    obra_id BLOB NOT NULL REFERENCES obras(id) ON DELETE CASCADE,
    material TEXT NOT NULL,
    quantidade REAL NOT NULL,
    unidade TEXT NULL,
    fornecedor TEXT NULL,
    data_recebimento TEXT NOT NULL,
    nota_fiscal TEXT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cargos (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    nome TEXT NOT NULL,
    valor_diaria REAL NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, nome)
);

CREATE TABLE IF NOT EXISTS maquinas (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    nome TEXT NOT NULL,
    valor_hora REAL NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, nome)
);
"#;
